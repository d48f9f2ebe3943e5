//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! circuit_breaker / retries / timeouts produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histogram)
//!
//! [observability] config section
//!     → init_observability (subscriber + optional Prometheus exporter)
//! ```

pub mod logging;
pub mod metrics;

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ObservabilityConfig;

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("metrics exporter failed to start: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),
}

/// Install logging at the configured level and, when enabled, the metrics exporter.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    if !logging::init_logging(&config.log_level) {
        tracing::debug!("Global subscriber already installed");
    }

    if !config.metrics_enabled {
        return Ok(());
    }

    let addr: SocketAddr = config.metrics_address.parse().map_err(|_| {
        tracing::error!(
            metrics_address = %config.metrics_address,
            "Failed to parse metrics address"
        );
        ObservabilityError::MetricsAddress(config.metrics_address.clone())
    })?;
    metrics::init_metrics(addr)?;
    Ok(())
}
