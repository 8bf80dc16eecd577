use crate::config::{delay_from_seconds, validate_settings};
use crate::core::lookup::{default_endpoint, DEFAULT_USER_AGENT};
use crate::core::ConfigProvider;
use crate::domain::model::{InputFormat, Operation, Provider};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub operation: Operation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    pub format: Option<InputFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub provider: Option<Provider>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<f64>,
    pub request_delay_seconds: Option<f64>,
    pub regeocode: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::InputNotFound {
                path: path.display().to_string(),
            },
            _ => EtlError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown names are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn input_format(&self) -> InputFormat {
        self.input.format.unwrap_or(InputFormat::Auto)
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn operation(&self) -> Operation {
        self.pipeline.operation
    }

    fn provider(&self) -> Provider {
        self.geocoder.provider.unwrap_or(Provider::Nominatim)
    }

    fn endpoint(&self) -> &str {
        self.geocoder
            .endpoint
            .as_deref()
            .unwrap_or_else(|| default_endpoint(self.provider()))
    }

    fn user_agent(&self) -> &str {
        self.geocoder.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// An unresolved `${VAR}` placeholder counts as no key.
    fn api_key(&self) -> Option<&str> {
        self.geocoder
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder.timeout_seconds.unwrap_or(10))
    }

    fn max_retries(&self) -> u32 {
        self.geocoder.max_retries.unwrap_or(3)
    }

    fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.geocoder.retry_delay_seconds.unwrap_or(2.0))
            .unwrap_or_default()
    }

    fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.geocoder.request_delay_seconds.unwrap_or(1.0))
            .unwrap_or_default()
    }

    fn regeocode(&self) -> bool {
        self.geocoder.regeocode.unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_settings(self)?;
        if let Some(seconds) = self.geocoder.retry_delay_seconds {
            delay_from_seconds("geocoder.retry_delay_seconds", seconds)?;
        }
        if let Some(seconds) = self.geocoder.request_delay_seconds {
            delay_from_seconds("geocoder.request_delay_seconds", seconds)?;
        }
        Ok(())
    }
}
