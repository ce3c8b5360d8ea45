use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::store::{HashAlgorithm, StoreSettings};
use crate::store::token_store::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TOKEN_LENGTH, DEFAULT_VALID_DURATION};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: Option<LoggingConfig>,
    pub templates: Option<TemplatesConfig>,
}

/// ================================
/// Token store
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// lifetime of an unused token, renewed on every checkout
    #[serde(default = "default_valid_duration_seconds")]
    pub valid_duration_seconds: u64,
    /// how often expired records are reclaimed
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    #[serde(default)]
    pub hash: HashAlgorithm,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            valid_duration_seconds: default_valid_duration_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            token_length: default_token_length(),
            hash: HashAlgorithm::default(),
        }
    }
}

impl StoreConfig {
    pub fn to_settings(&self) -> StoreSettings {
        StoreSettings {
            valid_duration: Duration::from_secs(self.valid_duration_seconds),
            sweep_interval: Duration::from_secs(self.sweep_interval_seconds),
            token_length: self.token_length,
            hash: self.hash.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplatesConfig {
    pub dir: PathBuf,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_valid_duration_seconds() -> u64 {
    DEFAULT_VALID_DURATION.as_secs()
}

fn default_sweep_interval_seconds() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_token_length() -> usize {
    DEFAULT_TOKEN_LENGTH
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
