use crate::core::{Pipeline, RunReport};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let operation = self.pipeline.operation();
        tracing::info!("Starting {} run...", operation);

        // Extract
        let records = self.pipeline.extract().await?;
        tracing::info!("Found {} locations", records.len());

        // Transform
        let result = self.pipeline.transform(records).await?;
        tracing::info!("Processed {} locations", result.records.len());

        // Load
        let output_path = self.pipeline.load(&result).await?;
        if let Some(path) = &output_path {
            tracing::info!("Output saved to: {}", path);
        }

        Ok(RunReport {
            operation,
            output_path,
            result,
        })
    }
}
