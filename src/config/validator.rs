//! Configuration validation with aggregated errors: every issue is collected
//! so a broken file is reported in one pass.

use tracing::error;

use crate::config::settings::{LoggingConfig, MetricsConfig, ServerConfig, ServiceConfig, StoreConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_store(&cfg.store, &mut errors);
    validate_server(&cfg.server, &mut errors);
    validate_metrics(&cfg.metrics, &mut errors);
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }
    if let Some(templates) = &cfg.templates {
        if templates.dir.as_os_str().is_empty() {
            errors.push("templates.dir must not be empty".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_store(store: &StoreConfig, errors: &mut Vec<String>) {
    if store.token_length == 0 {
        errors.push("store.token_length must be > 0".to_string());
    }
    if store.valid_duration_seconds == 0 {
        errors.push("store.valid_duration_seconds must be > 0".to_string());
    }
    if store.sweep_interval_seconds == 0 {
        errors.push("store.sweep_interval_seconds must be > 0".to_string());
    }
}

fn validate_server(server: &ServerConfig, errors: &mut Vec<String>) {
    if server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if server.port.parse::<u16>().is_err() {
        errors.push(format!("server.port '{}' is not a valid port", server.port));
    }
}

fn validate_metrics(metrics: &MetricsConfig, errors: &mut Vec<String>) {
    if metrics.is_enabled && !metrics.path.starts_with('/') {
        errors.push(format!("metrics.path '{}' must start with '/'", metrics.path));
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}
