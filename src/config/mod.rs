pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation;
#[cfg(feature = "cli")]
use crate::{
    core::lookup::{default_endpoint, DEFAULT_USER_AGENT},
    domain::model::{InputFormat, Operation, Provider},
    utils::validation::Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use std::time::Duration;

/// Longest wait, in seconds, accepted for any configured delay.
pub const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Checks shared by every configuration source.
pub fn validate_settings<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_path("input", config.input_path())?;
    validation::validate_path("output", config.output_path())?;
    validation::validate_url("geocoder.endpoint", config.endpoint())?;
    validation::validate_non_empty_string("geocoder.user_agent", config.user_agent())?;
    validation::validate_positive_number("geocoder.max_retries", config.max_retries(), 1)?;
    validation::validate_range(
        "geocoder.timeout_seconds",
        config.timeout().as_secs(),
        1,
        300,
    )?;

    if config.provider() == crate::domain::model::Provider::Google {
        validation::validate_required_field(
            "geocoder.api_key",
            &config.api_key().map(str::to_string),
        )?;
    }
    Ok(())
}

/// Converts a configured delay in seconds, rejecting negative or absurd values.
pub fn delay_from_seconds(field: &str, seconds: f64) -> Result<std::time::Duration> {
    if !seconds.is_finite() {
        return Err(crate::utils::error::EtlError::InvalidConfigValueError {
            field: field.to_string(),
            value: seconds.to_string(),
            reason: "Value must be a finite number".to_string(),
        });
    }
    validation::validate_range(field, seconds, 0.0, MAX_DELAY_SECONDS)?;
    Ok(std::time::Duration::from_secs_f64(seconds))
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "machine-locator")]
#[command(about = "Scrape retail machine locations and geocode their addresses")]
pub struct CliConfig {
    /// HTML page or records JSON to read
    #[arg(short, long, default_value = "locations.json")]
    pub input: String,

    /// Where the records JSON is written
    #[arg(short, long, default_value = "locations_with_coordinates.json")]
    pub output: String,

    #[arg(long, value_enum, default_value = "geocode")]
    pub operation: Operation,

    #[arg(long, value_enum, default_value = "auto")]
    pub input_format: InputFormat,

    #[arg(long, value_enum, default_value = "nominatim")]
    pub provider: Provider,

    /// Lookup endpoint; defaults to the provider's public endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Credential for the Google provider
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Identifying agent sent with every request; include a contact address
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[arg(long, default_value = "10")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    #[arg(long, default_value = "2")]
    pub retry_delay_seconds: f64,

    /// Pause between consecutive records
    #[arg(long, default_value = "1")]
    pub request_delay_seconds: f64,

    /// Query records that already have coordinates
    #[arg(long)]
    pub regeocode: bool,

    /// Read all settings from a TOML file instead
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn input_format(&self) -> InputFormat {
        self.input_format
    }

    fn output_path(&self) -> &str {
        &self.output
    }

    fn operation(&self) -> Operation {
        self.operation
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay_seconds).unwrap_or_default()
    }

    fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_seconds).unwrap_or_default()
    }

    fn regeocode(&self) -> bool {
        self.regeocode
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_settings(self)?;
        delay_from_seconds("geocoder.retry_delay_seconds", self.retry_delay_seconds)?;
        delay_from_seconds("geocoder.request_delay_seconds", self.request_delay_seconds)?;
        Ok(())
    }
}
