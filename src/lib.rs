//! Resilience control layer for calls to unreliable dependencies.
//!
//! Three independent components, composed by the caller (outermost first):
//!
//! ```text
//! CircuitBreaker → RetryExecutor → DeadlineGuard → operation
//! ```
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use resilience_kit::resilience::{
//!     BoxError, BreakerConfig, CircuitBreaker, DeadlineGuard, RetryExecutor,
//! };
//!
//! # async fn fetch_roster() -> Result<Vec<String>, BoxError> { Ok(Vec::new()) }
//! # async fn demo() -> Result<(), BoxError> {
//! let breaker = CircuitBreaker::new("student-db", BreakerConfig::default());
//! let retry = RetryExecutor::new(3, Duration::from_millis(100), 2.0, Duration::from_secs(2));
//! let deadline = DeadlineGuard::new(Duration::from_secs(5));
//!
//! let roster = breaker
//!     .call(|| retry.call(|| deadline.call(fetch_roster)))
//!     .await?;
//! # let _ = roster;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::ResilienceConfig;
pub use resilience::{CircuitBreaker, DeadlineGuard, RetryExecutor};
