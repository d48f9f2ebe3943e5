//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{BreakerSettings, ResilienceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("breaker '{service}': {field} must be greater than 0")]
    BreakerThreshold { service: String, field: &'static str },

    #[error("retry: {0}")]
    Retry(String),

    #[error("observability: invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("observability: unknown log level '{0}'")]
    LogLevel(String),
}

pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_breaker("<defaults>", &config.breaker_defaults, &mut errors);
    for (service, settings) in &config.breakers {
        validate_breaker(service, settings, &mut errors);
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::Retry("max_attempts must be at least 1".into()));
    }
    if !retry.exponential_factor.is_finite() || retry.exponential_factor < 1.0 {
        errors.push(ValidationError::Retry(format!(
            "exponential_factor must be >= 1.0, got {}",
            retry.exponential_factor
        )));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(ValidationError::Retry(format!(
            "max_delay_ms ({}) is below base_delay_ms ({})",
            retry.max_delay_ms, retry.base_delay_ms
        )));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }
    if !matches!(
        obs.log_level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(service: &str, settings: &BreakerSettings, errors: &mut Vec<ValidationError>) {
    if settings.failure_threshold == 0 {
        errors.push(ValidationError::BreakerThreshold {
            service: service.to_string(),
            field: "failure_threshold",
        });
    }
    if settings.success_threshold == 0 {
        errors.push(ValidationError::BreakerThreshold {
            service: service.to_string(),
            field: "success_threshold",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ResilienceConfig::default();
        config.breakers.insert(
            "jwt".into(),
            BreakerSettings {
                failure_threshold: 0,
                recovery_timeout_secs: 0,
                success_threshold: 0,
            },
        );
        config.retry.max_attempts = 0;
        config.retry.exponential_factor = 0.5;
        config.retry.max_delay_ms = 10;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "not-an-address".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 7);
        assert!(errors.contains(&ValidationError::BreakerThreshold {
            service: "jwt".into(),
            field: "failure_threshold",
        }));
        assert!(errors[0].to_string().contains("jwt"));
    }
}
