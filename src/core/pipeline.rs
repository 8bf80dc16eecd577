use crate::core::extractor;
use crate::core::geocoder::{Geocoder, RetryPolicy};
use crate::core::persistence;
use crate::core::{AddressLookup, ConfigProvider, LocationRecord, Pipeline, Storage, TransformResult};
use crate::domain::model::{InputFormat, Operation};
use crate::domain::report::{DatasetSummary, GeocodeSummary, ValidationReport};
use crate::utils::error::Result;

/// Reads a page or records file, applies the configured operation and writes
/// the records back out as JSON.
pub struct LocatorPipeline<S: Storage, C: ConfigProvider, L: AddressLookup> {
    storage: S,
    config: C,
    geocoder: Geocoder<L>,
}

impl<S: Storage, C: ConfigProvider, L: AddressLookup> LocatorPipeline<S, C, L> {
    pub fn new(storage: S, config: C, lookup: L) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries(),
            retry_delay: config.retry_delay(),
        };
        let geocoder = Geocoder::new(lookup, policy)
            .with_request_delay(config.request_delay())
            .with_regeocode(config.regeocode());

        Self {
            storage,
            config,
            geocoder,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, L: AddressLookup> Pipeline for LocatorPipeline<S, C, L> {
    fn operation(&self) -> Operation {
        self.config.operation()
    }

    async fn extract(&self) -> Result<Vec<LocationRecord>> {
        let path = self.config.input_path();
        let format = self.config.input_format().resolve(path);
        tracing::debug!("Reading {} as {:?}", path, format);

        match format {
            InputFormat::Json => persistence::load_records(&self.storage, path).await,
            InputFormat::Html | InputFormat::Auto => {
                let raw = persistence::read_input(&self.storage, path).await?;
                let markup = String::from_utf8_lossy(&raw);
                // 解析失敗時回傳空結果，讓流程繼續
                Ok(extractor::extract(&markup))
            }
        }
    }

    async fn transform(&self, data: Vec<LocationRecord>) -> Result<TransformResult> {
        let mut result = TransformResult::default();

        match self.config.operation() {
            Operation::Extract => {
                result.dataset_summary = Some(DatasetSummary::from_records(&data));
                result.records = data;
            }
            Operation::Geocode => {
                tracing::info!(
                    "Geocoding {} locations ({:?} between requests)",
                    data.len(),
                    self.config.request_delay()
                );
                let (records, reports) = self.geocoder.geocode_all(data).await;
                result.geocode_summary = Some(GeocodeSummary::from_records(&records));
                result.geocode_reports = reports;
                result.records = records;
            }
            Operation::Validate => {
                tracing::info!("Validating location data...");
                let report = ValidationReport::from_records(&data);
                tracing::info!("{} of {} locations are complete", report.valid, report.total);
                result.validation = Some(report);
                result.records = data;
            }
            Operation::Summarize => {
                result.dataset_summary = Some(DatasetSummary::from_records(&data));
                result.records = data;
            }
        }

        Ok(result)
    }

    async fn load(&self, result: &TransformResult) -> Result<Option<String>> {
        if !self.config.operation().writes_output() {
            tracing::debug!("{} does not write output", self.config.operation());
            return Ok(None);
        }

        let output_path = self.config.output_path();
        persistence::save_records(&self.storage, output_path, &result.records).await?;
        Ok(Some(output_path.to_string()))
    }
}
