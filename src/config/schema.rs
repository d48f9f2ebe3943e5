//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::observability::{init_observability, ObservabilityError};
use crate::resilience::{BreakerConfig, CircuitBreaker, DeadlineGuard, RetryExecutor, RetrySettings};

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Used for any breaker without its own section.
    pub breaker_defaults: BreakerSettings,

    /// Per-service breaker definitions, keyed by service name.
    pub breakers: BTreeMap<String, BreakerSettings>,

    /// Retry configuration.
    pub retry: RetryConfig,

    /// Deadline configuration.
    pub deadline: DeadlineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ResilienceConfig {
    /// Breaker settings for `service`, falling back to the defaults.
    pub fn breaker_settings(&self, service: &str) -> &BreakerSettings {
        self.breakers.get(service).unwrap_or(&self.breaker_defaults)
    }

    /// Build a breaker for `service` on the process-wide registry.
    pub fn breaker(&self, service: &str) -> CircuitBreaker {
        CircuitBreaker::new(service, self.breaker_settings(service).to_breaker_config())
    }

    pub fn retry_executor(&self) -> RetryExecutor {
        RetryExecutor::from_settings(self.retry.to_settings())
    }

    pub fn deadline_guard(&self) -> DeadlineGuard {
        DeadlineGuard::new(Duration::from_millis(self.deadline.default_timeout_ms))
    }

    /// Install logging and metrics as described by `[observability]`.
    pub fn init_observability(&self) -> Result<(), ObservabilityError> {
        init_observability(&self.observability)
    }
}

/// Circuit breaker definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BreakerSettings {
    /// Failures that open a closed circuit.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting trial calls.
    pub recovery_timeout_secs: u64,

    /// Half-open successes that close the circuit.
    pub success_threshold: u32,
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> BreakerConfig {
        BreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_secs),
            self.success_threshold,
        )
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            success_threshold: 2,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Growth factor between consecutive delays.
    pub exponential_factor: f64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn to_settings(&self) -> RetrySettings {
        RetrySettings {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            exponential_factor: self.exponential_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            exponential_factor: 2.0,
            max_delay_ms: 2000,
        }
    }
}

/// Deadline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Default budget in milliseconds; 0 disables enforcement.
    pub default_timeout_ms: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ResilienceConfig = toml::from_str("").unwrap();
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.deadline.default_timeout_ms, 30_000);
        assert!(config.breakers.is_empty());
    }

    #[test]
    fn test_breaker_lookup_falls_back_to_defaults() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [breaker_defaults]
            failure_threshold = 4

            [breakers.jwt]
            failure_threshold = 3
            recovery_timeout_secs = 30
            "#,
        )
        .unwrap();

        let jwt = config.breaker_settings("jwt");
        assert_eq!(jwt.failure_threshold, 3);
        assert_eq!(jwt.recovery_timeout_secs, 30);
        assert_eq!(jwt.success_threshold, 2);

        let other = config.breaker_settings("mysql");
        assert_eq!(other.failure_threshold, 4);
        assert_eq!(other.recovery_timeout_secs, 60);
    }

    #[test]
    fn test_factories() {
        let mut config = ResilienceConfig::default();
        config.retry.max_attempts = 7;
        config.deadline.default_timeout_ms = 250;

        assert_eq!(config.retry_executor().settings().max_attempts, 7);
        assert_eq!(
            config.deadline_guard().default_timeout(),
            Duration::from_millis(250)
        );

        config.observability.log_level = "error".to_string();
        assert!(config.init_observability().is_ok());

        let breaker = config.breaker("schema-factory-test");
        assert_eq!(breaker.config().failure_threshold, 5);
        assert_eq!(breaker.config().recovery_timeout, Duration::from_secs(60));
    }
}
