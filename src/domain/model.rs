use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A resolved latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

/// One retail location as scraped from the source page.
///
/// `coordinates` is `None` until the record has been geocoded, and stays `None`
/// when the lookup found nothing usable. On disk it is always an object with
/// `lat`/`lng` keys, both `null` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub machine_id: String,
    pub address: String,
    #[serde(default, with = "coordinates_format")]
    pub coordinates: Option<LatLng>,
}

impl LocationRecord {
    pub fn new(name: impl Into<String>, machine_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            machine_id: machine_id.into(),
            address: address.into(),
            coordinates: None,
        }
    }

    /// Builds a record from the street and city/state columns of a source row.
    pub fn from_parts(name: &str, machine_id: &str, street: &str, city_state: &str) -> Self {
        Self::new(name, machine_id, format!("{}, {}", street, city_state))
    }

    pub fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Name, id and address all present.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.machine_id.trim().is_empty()
            && !self.address.trim().is_empty()
    }
}

mod coordinates_format {
    use super::*;
    use serde::de::Error;

    #[derive(Serialize, Deserialize)]
    struct Wire {
        lat: Option<f64>,
        lng: Option<f64>,
    }

    pub fn serialize<S: Serializer>(value: &Option<LatLng>, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match value {
            Some(c) => Wire {
                lat: Some(c.lat),
                lng: Some(c.lng),
            },
            None => Wire { lat: None, lng: None },
        };
        wire.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LatLng>, D::Error> {
        let wire: Option<Wire> = Option::deserialize(deserializer)?;
        match wire {
            None => Ok(None),
            Some(Wire {
                lat: Some(lat),
                lng: Some(lng),
            }) => Ok(Some(LatLng { lat, lng })),
            Some(Wire { lat: None, lng: None }) => Ok(None),
            Some(_) => Err(D::Error::custom(
                "coordinates must carry both lat and lng, or neither",
            )),
        }
    }
}

/// What the pipeline was asked to do with the loaded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Markup in, records with empty coordinates out.
    Extract,
    Geocode,
    Validate,
    Summarize,
}

impl Operation {
    pub fn writes_output(self) -> bool {
        matches!(self, Operation::Extract | Operation::Geocode)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Extract => "extract",
            Operation::Geocode => "geocode",
            Operation::Validate => "validate",
            Operation::Summarize => "summarize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Decide by file extension: `.json` is a records file, anything else is markup.
    Auto,
    Html,
    Json,
}

impl InputFormat {
    pub fn resolve(self, path: &str) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_json = std::path::Path::new(path)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false);
                if is_json {
                    InputFormat::Json
                } else {
                    InputFormat::Html
                }
            }
            explicit => explicit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Nominatim,
    Google,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_coordinates_serialize_as_object() {
        let record = LocationRecord::from_parts("Walmart", "Q1001", "123 Main St", "Springfield, IL");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "Walmart",
                "machine_id": "Q1001",
                "address": "123 Main St, Springfield, IL",
                "coordinates": {"lat": null, "lng": null}
            })
        );
    }

    #[test]
    fn test_field_order_is_preserved() {
        let mut record = LocationRecord::new("Target", "Q2", "1 Oak Ave, Austin, TX");
        record.coordinates = Some(LatLng { lat: 30.27, lng: -97.74 });
        let text = serde_json::to_string(&record).unwrap();

        let name = text.find("\"name\"").unwrap();
        let id = text.find("\"machine_id\"").unwrap();
        let address = text.find("\"address\"").unwrap();
        let coords = text.find("\"coordinates\"").unwrap();
        assert!(name < id && id < address && address < coords);
    }

    #[test]
    fn test_half_filled_coordinates_are_rejected() {
        let text = r#"{"name":"A","machine_id":"Q1","address":"x","coordinates":{"lat":1.0,"lng":null}}"#;
        assert!(serde_json::from_str::<LocationRecord>(text).is_err());
    }

    #[test]
    fn test_missing_or_null_coordinates_load_as_none() {
        let missing = r#"{"name":"A","machine_id":"Q1","address":"x"}"#;
        let null = r#"{"name":"A","machine_id":"Q1","address":"x","coordinates":null}"#;
        assert_eq!(serde_json::from_str::<LocationRecord>(missing).unwrap().coordinates, None);
        assert_eq!(serde_json::from_str::<LocationRecord>(null).unwrap().coordinates, None);
    }

    #[test]
    fn test_input_format_resolution() {
        assert_eq!(InputFormat::Auto.resolve("machines.JSON"), InputFormat::Json);
        assert_eq!(InputFormat::Auto.resolve("page.html"), InputFormat::Html);
        assert_eq!(InputFormat::Auto.resolve("dump"), InputFormat::Html);
        assert_eq!(InputFormat::Html.resolve("machines.json"), InputFormat::Html);
    }

    #[test]
    fn test_is_complete() {
        assert!(LocationRecord::new("A", "Q1", "x").is_complete());
        assert!(!LocationRecord::new("A", " ", "x").is_complete());
    }
}
