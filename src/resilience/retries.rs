//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is retryable (see `classify.rs`)
//! - Re-invoke the operation with exponential backoff + jitter
//! - Surface the last error unchanged once attempts run out
//!
//! # Design Decisions
//! - Permanent errors fail on the first attempt
//! - Settings and classifier sit behind `ArcSwap`, so a shared executor can be
//!   retuned at runtime; each call works from the values loaded at its start
//! - An in-flight attempt is never cancelled; retries only decide whether to
//!   issue another attempt after the current one returns

use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::classify::RetryClassifier;
use crate::resilience::types::{BoxError, ResilienceResult};

/// Retry tuning values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrySettings {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub exponential_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            exponential_factor: 2.0,
            max_delay: Duration::from_millis(2000),
        }
    }
}

/// Re-invokes failing operations with backoff.
#[derive(Debug)]
pub struct RetryExecutor {
    settings: ArcSwap<RetrySettings>,
    classifier: ArcSwap<RetryClassifier>,
}

impl RetryExecutor {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        exponential_factor: f64,
        max_delay: Duration,
    ) -> Self {
        Self::from_settings(RetrySettings {
            max_attempts,
            base_delay,
            exponential_factor,
            max_delay,
        })
    }

    pub fn from_settings(settings: RetrySettings) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            classifier: ArcSwap::from_pointee(RetryClassifier::default()),
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier(self, classifier: RetryClassifier) -> Self {
        self.classifier.store(Arc::new(classifier));
        self
    }

    pub fn settings(&self) -> RetrySettings {
        **self.settings.load()
    }

    pub fn classifier(&self) -> Arc<RetryClassifier> {
        self.classifier.load_full()
    }

    pub fn set_max_attempts(&self, max_attempts: u32) {
        self.settings.rcu(|s| RetrySettings { max_attempts, ..**s });
    }

    pub fn set_base_delay(&self, base_delay: Duration) {
        self.settings.rcu(|s| RetrySettings { base_delay, ..**s });
    }

    pub fn set_exponential_factor(&self, exponential_factor: f64) {
        self.settings.rcu(|s| RetrySettings {
            exponential_factor,
            ..**s
        });
    }

    pub fn set_max_delay(&self, max_delay: Duration) {
        self.settings.rcu(|s| RetrySettings { max_delay, ..**s });
    }

    /// Treat `E` as retryable on subsequent calls.
    pub fn add_retryable_exception<E: std::error::Error + 'static>(&self) {
        self.classifier
            .rcu(|c| RetryClassifier::clone(c).add_retryable::<E>());
    }

    /// Run `operation`, retrying transient failures.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.call_with_hook(operation, |_, _, _| {}).await
    }

    /// Run `operation`, calling `on_retry(failed_attempts, &error, delay)`
    /// before each backoff sleep.
    pub async fn call_with_hook<T, E, F, Fut, H>(
        &self,
        mut operation: F,
        mut on_retry: H,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        H: FnMut(u32, &BoxError, Duration),
    {
        let settings = self.settings();
        let classifier = self.classifier.load_full();
        let max_attempts = settings.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            let err: BoxError = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e.into(),
            };

            if !classifier.is_retryable(&*err) {
                tracing::debug!(attempt, error = %err, "Non-retryable failure");
                return Err(err);
            }
            if attempt >= max_attempts {
                tracing::warn!(attempts = attempt, error = %err, "Retry attempts exhausted");
                return Err(err);
            }

            let delay = calculate_backoff(
                attempt,
                settings.base_delay,
                settings.exponential_factor,
                settings.max_delay,
            );
            on_retry(attempt, &err, delay);
            metrics::record_retry(attempt);
            tracing::info!(attempt, delay = ?delay, error = %err, "Retrying operation");

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Run `operation` with retries; on final failure return `fallback()`.
    pub async fn call_with_fallback<T, E, F, Fut, E2, FB, FbFut>(
        &self,
        operation: F,
        fallback: FB,
    ) -> ResilienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E2>>,
        E2: Into<BoxError>,
    {
        match self.call(operation).await {
            Ok(value) => Ok(value),
            Err(err) => {
                metrics::record_fallback("retry");
                tracing::debug!(error = %err, "Using retry fallback");
                fallback().await.map_err(Into::into)
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::from_settings(RetrySettings::default())
    }
}
