//! Error taxonomy shared by the resilience components.

use std::time::Duration;
use thiserror::Error;

/// Boxed error carried through every component.
///
/// Operations may fail with any error type; it is boxed unchanged so callers
/// can recover the original with `downcast_ref`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for guarded operations.
pub type ResilienceResult<T> = Result<T, BoxError>;

/// Rejection by an open circuit breaker. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Circuit breaker is OPEN for service: {service}")]
pub struct CircuitOpenError {
    pub service: String,
}

/// Raised when an operation does not produce a result within its budget.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Operation timed out after {}ms", elapsed.as_millis())]
pub struct TimeoutError {
    /// Wall-clock time observed when the deadline fired.
    pub elapsed: Duration,
    /// The budget that was exceeded.
    pub budget: Duration,
}

/// Marker for transient infrastructure failures (retryable by default).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransientError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, marking it transient.
    pub fn wrap(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Returns true if `err` (or anything in its source chain) is a `T`.
pub fn is_caused_by<T: std::error::Error + 'static>(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<T>() {
            return true;
        }
        current = e.source();
    }
    false
}
