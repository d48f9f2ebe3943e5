//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: trial calls test whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: now - last_failure >= recovery_timeout (checked lazily on every read)
//! Half-Open → Closed: success_count >= success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - State lives in a named `BreakerStore`, not in the breaker value
//! - No background timer; recovery is evaluated whenever state is read
//! - Rejections never touch the counters
//! - `success_count` is only cleared by `reset()`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::observability::metrics;
use crate::resilience::registry::{BreakerRegistry, BreakerStore};
use crate::resilience::types::{BoxError, CircuitOpenError, ResilienceResult};

/// Circuit state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable breaker definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Failures that open a closed circuit.
    pub failure_threshold: u32,
    /// Cool-down before an open circuit admits trial calls.
    pub recovery_timeout: Duration,
    /// Successes in half-open that close the circuit.
    pub success_threshold: u32,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Shared mutable state of one named breaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerRecord {
    pub state: CircuitState,
    /// Failures since the circuit last closed.
    pub failure_count: u32,
    /// Successes since the last explicit reset.
    pub success_count: u32,
    /// Milliseconds since the UNIX epoch of the latest failure (0 = never).
    pub last_failure_ms: u64,
}

impl BreakerRecord {
    /// Apply the lazy Open → Half-Open transition.
    fn resolve(&mut self, now_ms: u64, config: &BreakerConfig) -> Option<CircuitState> {
        if self.state == CircuitState::Open
            && u128::from(now_ms.saturating_sub(self.last_failure_ms))
                >= config.recovery_timeout.as_millis()
        {
            self.state = CircuitState::HalfOpen;
            return Some(CircuitState::HalfOpen);
        }
        None
    }

    fn record_success(&mut self, config: &BreakerConfig) -> Option<CircuitState> {
        self.success_count = self.success_count.saturating_add(1);
        if self.state == CircuitState::HalfOpen && self.success_count >= config.success_threshold {
            self.state = CircuitState::Closed;
            self.failure_count = 0;
            return Some(CircuitState::Closed);
        }
        None
    }

    fn record_failure(&mut self, now_ms: u64, config: &BreakerConfig) -> Option<CircuitState> {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_ms = now_ms;
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                Some(CircuitState::Open)
            }
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.state = CircuitState::Open;
                Some(CircuitState::Open)
            }
            _ => None,
        }
    }
}

/// A handle to a named circuit breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    service: String,
    config: BreakerConfig,
    store: Arc<dyn BreakerStore>,
}

impl CircuitBreaker {
    /// Create a breaker backed by the process-wide registry.
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_store(service, config, BreakerRegistry::global())
    }

    /// Create a breaker backed by an explicit store.
    pub fn with_store(
        service: impl Into<String>,
        config: BreakerConfig,
        store: Arc<dyn BreakerStore>,
    ) -> Self {
        Self {
            service: service.into(),
            config,
            store,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state, performing the lazy recovery transition.
    pub fn state(&self) -> CircuitState {
        self.snapshot().state
    }

    pub fn failure_count(&self) -> u32 {
        self.snapshot().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.snapshot().success_count
    }

    /// Milliseconds since the UNIX epoch of the latest failure, 0 if none.
    pub fn last_failure_time(&self) -> u64 {
        self.snapshot().last_failure_ms
    }

    /// Copy of the shared record after resolving recovery.
    pub fn snapshot(&self) -> BreakerRecord {
        let now = now_ms();
        let mut snapshot = BreakerRecord::default();
        let mut transition = None;
        self.store.update(&self.service, &mut |record| {
            transition = record.resolve(now, &self.config);
            snapshot = record.clone();
        });
        self.log_transition(transition);
        snapshot
    }

    /// Hard reset to Closed with zeroed counters.
    pub fn reset(&self) {
        self.store.update(&self.service, &mut |record| {
            *record = BreakerRecord::default();
        });
        tracing::info!(service = %self.service, "Circuit breaker reset");
    }

    /// Run `operation` through the breaker; failures propagate unchanged.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        if self.state() == CircuitState::Open {
            return Err(self.reject().into());
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                let err = e.into();
                self.on_failure(&err);
                Err(err)
            }
        }
    }

    /// Run `operation` through the breaker, substituting `fallback` when the
    /// circuit is open or the operation fails. Fallback errors propagate.
    pub async fn call_with_fallback<T, E, F, Fut, E2, FB, FbFut>(
        &self,
        operation: F,
        fallback: FB,
    ) -> ResilienceResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
        FB: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E2>>,
        E2: Into<BoxError>,
    {
        if self.state() == CircuitState::Open {
            self.reject();
        } else {
            match operation().await {
                Ok(value) => {
                    self.on_success();
                    return Ok(value);
                }
                Err(e) => self.on_failure(&e.into()),
            }
        }

        metrics::record_fallback("circuit_breaker");
        tracing::debug!(service = %self.service, "Using circuit breaker fallback");
        fallback().await.map_err(Into::into)
    }

    fn reject(&self) -> CircuitOpenError {
        metrics::record_breaker_rejection(&self.service);
        tracing::debug!(service = %self.service, "Circuit open, rejecting call");
        CircuitOpenError {
            service: self.service.clone(),
        }
    }

    fn on_success(&self) {
        let mut transition = None;
        self.store.update(&self.service, &mut |record| {
            transition = record.record_success(&self.config);
        });
        self.log_transition(transition);
    }

    fn on_failure(&self, err: &BoxError) {
        let now = now_ms();
        let mut transition = None;
        let mut failures = 0;
        self.store.update(&self.service, &mut |record| {
            transition = record.record_failure(now, &self.config);
            failures = record.failure_count;
        });
        tracing::debug!(service = %self.service, failures, error = %err, "Guarded call failed");
        self.log_transition(transition);
    }

    fn log_transition(&self, transition: Option<CircuitState>) {
        let Some(to) = transition else { return };
        metrics::record_breaker_transition(&self.service, to);
        match to {
            CircuitState::Open => {
                tracing::warn!(service = %self.service, state = %to, "Circuit breaker opened")
            }
            _ => tracing::info!(service = %self.service, state = %to, "Circuit breaker state changed"),
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("record", &self.store.snapshot(&self.service))
            .finish()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
