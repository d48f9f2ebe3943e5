//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an unreliable dependency (outermost first):
//!     → circuit_breaker.rs (fail fast while the dependency is unhealthy)
//!     → retries.rs (retry transient failures with backoff, see classify.rs)
//!     → timeouts.rs (bound each attempt by a deadline)
//!     → operation
//! ```
//!
//! # Design Decisions
//! - The three components do not know about each other; callers compose them
//! - Breaker outermost, so per-attempt retries do not trip it
//! - Deadline innermost, so retries never wait on an attempt past its budget
//! - Every component rethrows the original error unless a fallback is given

pub mod backoff;
pub mod circuit_breaker;
pub mod classify;
pub mod registry;
pub mod retries;
pub mod timeouts;
pub mod types;

pub use circuit_breaker::{BreakerConfig, BreakerRecord, CircuitBreaker, CircuitState};
pub use classify::RetryClassifier;
pub use registry::{BreakerRegistry, BreakerStore};
pub use retries::{RetryExecutor, RetrySettings};
pub use timeouts::DeadlineGuard;
pub use types::{BoxError, CircuitOpenError, ResilienceResult, TimeoutError, TransientError};
