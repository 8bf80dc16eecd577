use crate::domain::model::Provider;
use crate::domain::ports::{AddressLookup, ConfigProvider, LookupMatch, LookupReply};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const GOOGLE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Nominatim's usage policy asks for an identifying agent with a way to reach the operator.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "machine-locator/",
    env!("CARGO_PKG_VERSION"),
    " (locator-admin@example.com)"
);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Accepts both `"39.78"` and `39.78`; Nominatim sends strings, Google numbers.
/// `NaN` and infinities are rejected since JSON cannot carry them.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    lat: serde_json::Value,
    #[serde(default)]
    lon: serde_json::Value,
}

/// OpenStreetMap Nominatim search.
pub struct NominatimLookup {
    client: Client,
    endpoint: String,
}

impl NominatimLookup {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AddressLookup for NominatimLookup {
    async fn lookup(&self, address: &str) -> Result<LookupReply> {
        tracing::debug!("Nominatim request for: {}", address);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Nominatim response status: {}", status);

        match status {
            StatusCode::OK => {
                let places: Vec<NominatimPlace> = response.json().await?;
                let mut matches = Vec::with_capacity(places.len());
                for place in places {
                    match (coordinate(&place.lat), coordinate(&place.lon)) {
                        (Some(lat), Some(lng)) => matches.push(LookupMatch { lat, lng }),
                        _ => {
                            return Ok(LookupReply::Malformed(format!(
                                "unreadable coordinates lat={} lon={}",
                                place.lat, place.lon
                            )))
                        }
                    }
                }
                Ok(LookupReply::Matches(matches))
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(LookupReply::RateLimited),
            other => Ok(LookupReply::Status(other.as_u16())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: serde_json::Value,
    lng: serde_json::Value,
}

/// Google Maps Geocoding API, keyed by an API credential.
pub struct GoogleLookup {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleLookup {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl AddressLookup for GoogleLookup {
    async fn lookup(&self, address: &str) -> Result<LookupReply> {
        tracing::debug!("Google geocode request for: {}", address);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Ok(LookupReply::RateLimited),
            other => return Ok(LookupReply::Status(other.as_u16())),
        }

        let body: GoogleResponse = response.json().await?;
        let reason = || body.error_message.clone().unwrap_or_else(|| body.status.clone());

        // Google reports most failures inside a 200 body.
        let reply = match body.status.as_str() {
            "OK" => {
                let mut matches = Vec::with_capacity(body.results.len());
                for result in &body.results {
                    let location = &result.geometry.location;
                    match (coordinate(&location.lat), coordinate(&location.lng)) {
                        (Some(lat), Some(lng)) => matches.push(LookupMatch { lat, lng }),
                        _ => {
                            return Ok(LookupReply::Malformed(format!(
                                "unreadable coordinates lat={} lng={}",
                                location.lat, location.lng
                            )))
                        }
                    }
                }
                LookupReply::Matches(matches)
            }
            "ZERO_RESULTS" => LookupReply::Matches(Vec::new()),
            "OVER_QUERY_LIMIT" => LookupReply::RateLimited,
            "UNKNOWN_ERROR" => LookupReply::Status(StatusCode::SERVICE_UNAVAILABLE.as_u16()),
            _ => LookupReply::Rejected(reason()),
        };
        Ok(reply)
    }
}

/// Builds the lookup client the configuration asks for.
pub fn lookup_from_config<C: ConfigProvider>(config: &C) -> Result<Box<dyn AddressLookup>> {
    match config.provider() {
        Provider::Nominatim => Ok(Box::new(NominatimLookup::new(
            config.endpoint(),
            config.user_agent(),
            config.timeout(),
        )?)),
        Provider::Google => {
            let api_key = config.api_key().ok_or_else(|| EtlError::MissingConfigError {
                field: "geocoder.api_key".to_string(),
            })?;
            Ok(Box::new(GoogleLookup::new(
                config.endpoint(),
                api_key,
                config.user_agent(),
                config.timeout(),
            )?))
        }
    }
}

/// Endpoint used when none is configured.
pub fn default_endpoint(provider: Provider) -> &'static str {
    match provider {
        Provider::Nominatim => NOMINATIM_ENDPOINT,
        Provider::Google => GOOGLE_ENDPOINT,
    }
}
