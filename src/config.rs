//! Configuration management for csvpush
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section is optional; command-line flags may override individual
//! values before validation.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default Pushgateway address when none is configured
pub const DEFAULT_GATEWAY_ADDRESS: &str = "localhost:9091";

/// Upper bound for the push timeout in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub metric: MetricConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Metric identity: name, help text and the job it is pushed under
///
/// Values are not validated here. The metric registry rejects unusable
/// names when the schema is defined, and the gateway rejects unusable jobs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub job: String,
}

/// Pushgateway connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// `host:port` or a full `http(s)://` URL
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub method: PushMethod,
    /// Extra grouping key labels appended after the job
    #[serde(default)]
    pub grouping: BTreeMap<String, String>,
}

impl GatewayConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_seconds: default_timeout(),
            method: PushMethod::default(),
            grouping: BTreeMap::new(),
        }
    }
}

fn default_address() -> String {
    DEFAULT_GATEWAY_ADDRESS.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// HTTP method used for pushes
///
/// `Put` replaces every metric stored under the grouping key, `Post` only
/// replaces metrics with the same name.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PushMethod {
    #[default]
    Put,
    Post,
}

/// CSV reader settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Trim surrounding whitespace from headers and fields
    #[serde(default)]
    pub trim: bool,
}

impl SourceConfig {
    /// Delimiter as the single byte the CSV reader expects
    ///
    /// Only meaningful after `Config::validate()` has accepted the value.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            trim: false,
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config.validate().map_err(|e| match e {
            AppError::Config(reason) => AppError::Config(format!("{}: {}", path_display, reason)),
            other => other,
        })?;

        tracing::debug!(path = %path_display, "Loaded configuration file");
        Ok(config)
    }

    /// Validate configuration after parsing or after applying overrides
    pub fn validate(&self) -> AppResult<()> {
        if self.gateway.address.trim().is_empty() {
            return Err(AppError::Config(
                "gateway.address must not be empty (e.g. \"localhost:9091\")".to_string(),
            ));
        }

        if self.gateway.timeout_seconds == 0 {
            return Err(AppError::Config(
                "gateway.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.gateway.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "gateway.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.gateway.timeout_seconds
            )));
        }

        for (label, value) in &self.gateway.grouping {
            if label.is_empty() {
                return Err(AppError::Config(format!(
                    "gateway.grouping has an empty label name (value '{}')",
                    value
                )));
            }
        }

        let delimiter = self.source.delimiter.as_bytes();
        if delimiter.len() != 1 || !delimiter[0].is_ascii() {
            return Err(AppError::Config(format!(
                "source.delimiter must be a single ASCII character, got '{}'",
                self.source.delimiter
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
