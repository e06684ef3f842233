#![allow(clippy::collapsible_if)]

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::models::AppConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid URL for '{field}' ('{url}'): {reason}")]
    InvalidUrl {
        field: String,
        url: String,
        reason: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Application configuration validator
pub struct AppConfigValidator;

impl AppConfigValidator {
    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(config: &AppConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.proxy.listen_addr) {
            errors.push(e);
        }

        for (field, url) in [
            ("proxy.backend_base_url", &config.proxy.backend_base_url),
            ("client.api_base_url", &config.client.api_base_url),
        ] {
            if let Err(e) = Self::validate_url(url, field) {
                errors.push(e);
            }
        }

        if config.client.use_proxy {
            if let Err(e) = Self::validate_url(&config.client.proxy_base_url, "client.proxy_base_url")
            {
                errors.push(e);
            }
        }

        if config.client.timeout_ms == 0 {
            errors.push(ValidationError::InvalidField {
                field: "client.timeout_ms".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        if config.proxy.health_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "proxy.health_timeout_secs".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        if config.session.store_path.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "session.store_path".to_string(),
                message: "Session store path cannot be empty".to_string(),
            });
        }

        if EnvFilter::try_new(&config.logging.level).is_err() {
            errors.push(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: format!("'{}' is not a valid filter directive", config.logging.level),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate that a base address is an absolute http(s) URL
    fn validate_url(url: &str, field: &str) -> ValidationResult<()> {
        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
            field: field.to_string(),
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ValidationError::InvalidUrl {
                field: field.to_string(),
                url: url.to_string(),
                reason: format!("unsupported scheme '{other}', expected http or https"),
            }),
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let lines: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {}", i + 1, e))
            .collect();
        format!("{} error(s) found:\n{}", errors.len(), lines.join("\n"))
    }
}
