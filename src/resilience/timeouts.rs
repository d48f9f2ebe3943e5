//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound how long a caller waits for an operation's result
//! - Cancel the operation when its deadline fires
//! - Let callers substitute a degraded result on failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the operation future is dropped when the
//!   deadline wins the race
//! - A result that becomes ready only after the budget (e.g. a future that
//!   blocked its thread) is still rejected, so a caller never receives a result
//!   after its deadline
//! - A zero budget disables enforcement
//! - `call_with_handler` fires on any failure; `call_on_deadline` fires only
//!   on a genuine overrun

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::resilience::types::{BoxError, ResilienceResult, TimeoutError};

enum Outcome<T> {
    Completed(T),
    Failed(BoxError),
    Exceeded(TimeoutError),
}

/// Enforces a per-call time budget.
#[derive(Debug)]
pub struct DeadlineGuard {
    default_timeout_ms: AtomicU64,
}

impl DeadlineGuard {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout_ms: AtomicU64::new(duration_ms(default_timeout)),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms.load(Ordering::Relaxed))
    }

    /// Update the default budget for subsequent calls.
    pub fn set_timeout(&self, timeout: Duration) {
        self.default_timeout_ms
            .store(duration_ms(timeout), Ordering::Relaxed);
    }

    /// Run `operation` under the default budget.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.call_with_timeout(operation, self.default_timeout()).await
    }

    /// Run `operation` under an explicit budget.
    pub async fn call_with_timeout<T, E, F, Fut>(
        &self,
        operation: F,
        timeout: Duration,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        match self.run(operation, timeout).await.1 {
            Outcome::Completed(value) => Ok(value),
            Outcome::Failed(err) => Err(err),
            Outcome::Exceeded(err) => Err(err.into()),
        }
    }

    /// Run `operation`; on any failure (deadline or otherwise) return
    /// `on_failure(elapsed, error)` instead. Handler errors propagate.
    pub async fn call_with_handler<T, E, F, Fut, E2, H, HFut>(
        &self,
        operation: F,
        timeout: Option<Duration>,
        on_failure: H,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        H: FnOnce(Duration, BoxError) -> HFut,
        HFut: Future<Output = Result<T, E2>>,
        E2: Into<BoxError>,
    {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        let (elapsed, outcome) = self.run(operation, timeout).await;
        let err = match outcome {
            Outcome::Completed(value) => return Ok(value),
            Outcome::Failed(err) => err,
            Outcome::Exceeded(err) => err.into(),
        };
        metrics::record_fallback("deadline");
        on_failure(elapsed, err).await.map_err(Into::into)
    }

    /// Run `operation`; only a deadline overrun is handed to
    /// `on_exceeded(elapsed, timeout_error)`. Other errors propagate.
    pub async fn call_on_deadline<T, E, F, Fut, E2, H, HFut>(
        &self,
        operation: F,
        timeout: Option<Duration>,
        on_exceeded: H,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        H: FnOnce(Duration, TimeoutError) -> HFut,
        HFut: Future<Output = Result<T, E2>>,
        E2: Into<BoxError>,
    {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        match self.run(operation, timeout).await {
            (_, Outcome::Completed(value)) => Ok(value),
            (_, Outcome::Failed(err)) => Err(err),
            (elapsed, Outcome::Exceeded(err)) => {
                metrics::record_fallback("deadline");
                on_exceeded(elapsed, err).await.map_err(Into::into)
            }
        }
    }

    /// Run `operation`; on any failure return `fallback(error)`.
    pub async fn call_with_fallback<T, E, F, Fut, E2, FB, FbFut>(
        &self,
        operation: F,
        fallback: FB,
        timeout: Option<Duration>,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        FB: FnOnce(BoxError) -> FbFut,
        FbFut: Future<Output = Result<T, E2>>,
        E2: Into<BoxError>,
    {
        self.call_with_handler(operation, timeout, |_, err| fallback(err))
            .await
    }

    async fn run<T, E, F, Fut>(&self, operation: F, budget: Duration) -> (Duration, Outcome<T>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let start = Instant::now();

        if budget.is_zero() {
            let outcome = match operation().await {
                Ok(value) => Outcome::Completed(value),
                Err(e) => Outcome::Failed(e.into()),
            };
            return (start.elapsed(), outcome);
        }

        let outcome = match tokio::time::timeout(budget, operation()).await {
            Ok(Ok(value)) if start.elapsed() <= budget => Outcome::Completed(value),
            Ok(Ok(_)) | Err(_) => Outcome::Exceeded(TimeoutError {
                elapsed: start.elapsed(),
                budget,
            }),
            Ok(Err(e)) => Outcome::Failed(e.into()),
        };

        let elapsed = start.elapsed();
        if let Outcome::Exceeded(err) = &outcome {
            metrics::record_timeout();
            tracing::warn!(
                budget = ?err.budget,
                elapsed = ?elapsed,
                "Operation exceeded its deadline"
            );
        }
        (elapsed, outcome)
    }
}

impl Default for DeadlineGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
