// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all errors instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::AtendeConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &AtendeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.base_url must not be empty".to_string(),
        });
    } else if !config.gateway.base_url.starts_with("http://")
        && !config.gateway.base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "gateway.base_url `{}` must start with http:// or https://",
                config.gateway.base_url
            ),
        });
    }

    if config.gateway.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.timeout_secs must be at least 1".to_string(),
        });
    }

    if let Some(url) = &config.webhook.url
        && !url.starts_with("http://")
        && !url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!("webhook.url `{url}` must start with http:// or https://"),
        });
    }

    if config.arbiter.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "arbiter.sweep_interval_secs must be at least 1".to_string(),
        });
    }

    if config.arbiter.history_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "arbiter.history_limit must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AtendeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AtendeConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn bad_gateway_url_fails_validation() {
        let mut config = AtendeConfig::default();
        config.gateway.base_url = "ftp://gateway".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("base_url"))
        ));
    }

    #[test]
    fn zero_sweep_interval_fails_validation() {
        let mut config = AtendeConfig::default();
        config.arbiter.sweep_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("sweep_interval_secs"))
        ));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = AtendeConfig::default();
        config.server.host = "".to_string();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
