use crate::domain::model::{LocationRecord, Operation};
use std::time::Duration;

/// Terminal state of one record after the geocoder is done with it.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeStatus {
    Success,
    /// Coordinates were already present and the record was left alone.
    AlreadyGeocoded,
    NotFound,
    /// Every attempt hit a rate limit, an HTTP error or a transport error.
    Exhausted { last_error: String },
    /// A match came back but its coordinates could not be read.
    Malformed { reason: String },
    /// The service refused the request outright (bad key, invalid query).
    Rejected { reason: String },
    EmptyAddress,
}

/// How one record was geocoded: outcome, requests sent, backoff waits taken.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeReport {
    pub machine_id: String,
    pub status: GeocodeStatus,
    pub requests: u32,
    pub backoffs: Vec<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub successful_examples: Vec<LocationRecord>,
    pub failed_examples: Vec<LocationRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub valid: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub total: usize,
    pub unique_retailers: usize,
    /// Highest counts first.
    pub top_retailers: Vec<(String, usize)>,
    pub with_coordinates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub records: Vec<LocationRecord>,
    pub geocode_reports: Vec<GeocodeReport>,
    pub geocode_summary: Option<GeocodeSummary>,
    pub validation: Option<ValidationReport>,
    pub dataset_summary: Option<DatasetSummary>,
}

/// What an engine run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub operation: Operation,
    pub output_path: Option<String>,
    pub result: TransformResult,
}
