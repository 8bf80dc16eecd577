use crate::domain::model::LocationRecord;
use crate::domain::report::{DatasetSummary, GeocodeSummary, ValidationReport};
use std::collections::HashMap;
use std::fmt;

const MAX_EXAMPLES: usize = 5;
const TOP_RETAILERS: usize = 10;

impl GeocodeSummary {
    pub fn from_records(records: &[LocationRecord]) -> Self {
        let (geocoded, missing): (Vec<&LocationRecord>, Vec<&LocationRecord>) =
            records.iter().partition(|r| r.is_geocoded());

        Self {
            succeeded: geocoded.len(),
            failed: missing.len(),
            successful_examples: geocoded.into_iter().take(MAX_EXAMPLES).cloned().collect(),
            failed_examples: missing.into_iter().take(MAX_EXAMPLES).cloned().collect(),
        }
    }
}

impl fmt::Display for GeocodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Geocoding Summary:")?;
        writeln!(f, "✓ Successfully geocoded: {}", self.succeeded)?;
        writeln!(f, "✗ Failed to geocode: {}", self.failed)?;

        if !self.successful_examples.is_empty() {
            writeln!(f, "\nFirst few successful geocodes:")?;
            for location in &self.successful_examples {
                writeln!(
                    f,
                    "✓ {} ({}) - {}",
                    location.name, location.machine_id, location.address
                )?;
                if let Some(coordinates) = location.coordinates {
                    writeln!(f, "  Coordinates: {}", coordinates)?;
                }
            }
        }

        if !self.failed_examples.is_empty() {
            writeln!(f, "\nFirst few failed geocodes:")?;
            for location in &self.failed_examples {
                writeln!(
                    f,
                    "✗ {} ({}) - {}",
                    location.name, location.machine_id, location.address
                )?;
            }
        }
        Ok(())
    }
}

impl ValidationReport {
    pub fn from_records(records: &[LocationRecord]) -> Self {
        Self {
            valid: records.iter().filter(|r| r.is_complete()).count(),
            total: records.len(),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Found {} valid locations out of {} total",
            self.valid, self.total
        )
    }
}

impl DatasetSummary {
    pub fn from_records(records: &[LocationRecord]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            let name = if record.name.is_empty() {
                "Unknown"
            } else {
                record.name.as_str()
            };
            *counts.entry(name).or_insert(0) += 1;
        }

        let mut retailers: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        retailers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let unique_retailers = retailers.len();
        retailers.truncate(TOP_RETAILERS);

        Self {
            total: records.len(),
            unique_retailers,
            top_retailers: retailers,
            with_coordinates: records.iter().filter(|r| r.is_geocoded()).count(),
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "Total locations: {}", self.total)?;
        writeln!(f, "Unique retailers: {}", self.unique_retailers)?;
        writeln!(f, "Top retailers:")?;
        for (retailer, count) in &self.top_retailers {
            writeln!(f, "  {}: {} locations", retailer, count)?;
        }
        writeln!(
            f,
            "Locations with coordinates: {}/{}",
            self.with_coordinates, self.total
        )
    }
}
