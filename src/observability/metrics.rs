//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_breaker_transitions_total` (counter): state changes by service, state
//! - `resilience_breaker_rejections_total` (counter): calls refused by an open circuit
//! - `resilience_retries_total` (counter): retry attempts issued
//! - `resilience_retry_attempt` (histogram): failed-attempt number at each retry
//! - `resilience_timeouts_total` (counter): deadline overruns
//! - `resilience_fallbacks_total` (counter): fallbacks substituted, by component
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is opt-in via `init_metrics`

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and start its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_breaker_transition(service: &str, to: CircuitState) {
    metrics::counter!(
        "resilience_breaker_transitions_total",
        "service" => service.to_string(),
        "state" => to.as_str()
    )
    .increment(1);
}

pub fn record_breaker_rejection(service: &str) {
    metrics::counter!("resilience_breaker_rejections_total", "service" => service.to_string())
        .increment(1);
}

pub fn record_retry(attempt: u32) {
    metrics::counter!("resilience_retries_total").increment(1);
    metrics::histogram!("resilience_retry_attempt").record(f64::from(attempt));
}

pub fn record_timeout() {
    metrics::counter!("resilience_timeouts_total").increment(1);
}

pub fn record_fallback(component: &'static str) {
    metrics::counter!("resilience_fallbacks_total", "component" => component).increment(1);
}
