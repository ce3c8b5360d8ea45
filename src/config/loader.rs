use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::{LogFormat, LoggingConfig, ServiceConfig};
use crate::config::validator::validate_service_config;

/// Load and validate config from YAML file
pub fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if service_config.logging.is_none() {
        service_config.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    debug!("validating config ...");
    validate_service_config(&service_config)
        .map_err(|errors| anyhow!("invalid config: {}", errors.join("; ")))?;

    Ok(service_config)
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    fn empty_sections_fall_back_to_defaults() {
        let cfg = parse_config("{}").unwrap();
        let settings = cfg.store.to_settings();
        assert_eq!(settings.valid_duration, Duration::from_secs(900));
        assert_eq!(settings.sweep_interval, Duration::from_secs(60));
        assert_eq!(settings.token_length, 32);
        assert_eq!(settings.hash.name(), "sha256");
        assert_eq!(cfg.server.port, "8080");
        assert!(!cfg.metrics.is_enabled);
        assert_eq!(cfg.logging.unwrap().format, LogFormat::Compact);
    }

    #[test]
    fn full_config_parses() {
        let yaml = r#"
store:
  valid_duration_seconds: 30
  sweep_interval_seconds: 5
  token_length: 48
  hash: sha512
server:
  host: 0.0.0.0
  port: "9000"
metrics:
  is_enabled: true
  path: /metrics
logging:
  level: debug
  format: json
templates:
  dir: ./templates
"#;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.store.token_length, 48);
        assert_eq!(cfg.store.hash.name(), "sha512");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert!(cfg.metrics.is_enabled);
        assert_eq!(cfg.logging.unwrap().format, LogFormat::Json);
        assert_eq!(cfg.templates.unwrap().dir, Path::new("./templates"));
    }

    #[test]
    fn invalid_values_are_all_reported() {
        let yaml = r#"
store:
  token_length: 0
  sweep_interval_seconds: 0
server:
  port: "not-a-port"
"#;
        let err = parse_config(yaml).unwrap_err().to_string();
        assert!(err.contains("store.token_length"));
        assert!(err.contains("store.sweep_interval_seconds"));
        assert!(err.contains("server.port"));
    }

    #[test]
    fn unknown_hash_is_rejected() {
        assert!(parse_config("store:\n  hash: md5\n").is_err());
    }

    #[test]
    #[serial]
    fn env_vars_are_expanded_with_defaults() {
        std::env::set_var("TOKEN_HOLDER_TEST_LEN", "64");
        let expanded = expand_env_vars(
            "token_length: ${TOKEN_HOLDER_TEST_LEN}\nport: ${TOKEN_HOLDER_TEST_UNSET:7070}",
        )
        .unwrap();
        std::env::remove_var("TOKEN_HOLDER_TEST_LEN");
        assert_eq!(expanded, "token_length: 64\nport: 7070");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = file_to_config(Path::new("/no/such/token-holder.yaml")).unwrap_err();
        assert!(err.to_string().contains("/no/such/token-holder.yaml"));
    }
}
