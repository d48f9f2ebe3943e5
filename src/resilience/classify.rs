//! Failure classification for retries.
//!
//! # Rules
//! - An error is retryable if any error in its `source()` chain is of a
//!   registered transient type, or its message contains a known transient
//!   infrastructure pattern
//! - `CircuitOpenError` is never retryable; retrying it would defeat the breaker
//! - Everything else is permanent and fails on the first attempt

use std::error::Error;
use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;

use crate::resilience::types::{is_caused_by, CircuitOpenError, TimeoutError, TransientError};

/// Message fragments (lowercase) that mark an error as transient.
pub const DEFAULT_TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "timed out",
    "host is down",
    "network is unreachable",
    "no route to host",
    "deadlock",
    "sqlstate[hy000]",
    "server has gone away",
];

type Matcher = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// A caller-owned set of retryable error matchers.
#[derive(Clone)]
pub struct RetryClassifier {
    matchers: Vec<(String, Matcher)>,
    patterns: Vec<String>,
}

impl RetryClassifier {
    /// A classifier that retries nothing.
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Register an error type as retryable wherever it appears in the source chain.
    pub fn add_retryable<E: Error + 'static>(mut self) -> Self {
        self.matchers.push((
            std::any::type_name::<E>().to_string(),
            Arc::new(|err: &(dyn Error + 'static)| is_caused_by::<E>(err)),
        ));
        self
    }

    /// Register a case-insensitive message fragment.
    pub fn add_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into().to_lowercase());
        self
    }

    /// Register an arbitrary predicate.
    pub fn add_matcher<F>(mut self, name: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.matchers.push((name.into(), Arc::new(matcher)));
        self
    }

    pub fn is_retryable(&self, err: &(dyn Error + 'static)) -> bool {
        if is_caused_by::<CircuitOpenError>(err) {
            return false;
        }

        if self.matchers.iter().any(|(_, matches)| matches(err)) {
            return true;
        }

        let mut current = Some(err);
        while let Some(e) = current {
            let message = e.to_string().to_lowercase();
            if self.patterns.iter().any(|p| message.contains(p.as_str())) {
                return true;
            }
            current = e.source();
        }
        false
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        let mut classifier = Self::empty()
            .add_retryable::<TransientError>()
            .add_retryable::<TimeoutError>()
            .add_matcher("transient io error", is_transient_io);
        for pattern in DEFAULT_TRANSIENT_PATTERNS {
            classifier = classifier.add_pattern(*pattern);
        }
        classifier
    }
}

impl fmt::Debug for RetryClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClassifier")
            .field(
                "matchers",
                &self.matchers.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("patterns", &self.patterns)
            .finish()
    }
}

fn is_transient_io(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::TimedOut
                    | ErrorKind::BrokenPipe
                    | ErrorKind::Interrupted
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::types::BoxError;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("validation failed: {0}")]
    struct ValidationError(String);

    #[derive(Debug, thiserror::Error)]
    #[error("lock wait exceeded")]
    struct LockWaitError;

    fn boxed(e: impl Into<BoxError>) -> BoxError {
        e.into()
    }

    #[test]
    fn test_default_categories() {
        let classifier = RetryClassifier::default();

        let transient = boxed(TransientError::new("replica lagging"));
        assert!(classifier.is_retryable(&*transient));

        let timeout = boxed(TimeoutError {
            elapsed: Duration::from_millis(20),
            budget: Duration::from_millis(10),
        });
        assert!(classifier.is_retryable(&*timeout));

        let refused = boxed(std::io::Error::from(ErrorKind::ConnectionRefused));
        assert!(classifier.is_retryable(&*refused));

        let not_found = boxed(std::io::Error::new(ErrorKind::NotFound, "missing row"));
        assert!(!classifier.is_retryable(&*not_found));
    }

    #[test]
    fn test_message_patterns() {
        let classifier = RetryClassifier::default();

        for msg in [
            "SQLSTATE[HY000] [2002] Connection refused",
            "Deadlock found when trying to get lock",
            "Network is unreachable",
            "php_network_getaddresses: Host is down",
        ] {
            let err = boxed(msg);
            assert!(classifier.is_retryable(&*err), "{}", msg);
        }

        let err = boxed(ValidationError("grade out of range".into()));
        assert!(!classifier.is_retryable(&*err));
    }

    #[test]
    fn test_pattern_in_source_chain() {
        let classifier = RetryClassifier::empty().add_pattern("Deadlock");
        let inner = std::io::Error::new(ErrorKind::Other, "deadlock detected");
        let err = boxed(TransientError::wrap("write failed", inner));
        assert!(classifier.is_retryable(&*err));
    }

    #[test]
    fn test_circuit_open_never_retryable() {
        let classifier = RetryClassifier::default().add_retryable::<CircuitOpenError>();
        let err = boxed(CircuitOpenError {
            service: "connection refused".into(),
        });
        assert!(!classifier.is_retryable(&*err));
    }

    #[test]
    fn test_custom_registration() {
        let err = boxed(LockWaitError);
        assert!(!RetryClassifier::default().is_retryable(&*err));

        let classifier = RetryClassifier::default().add_retryable::<LockWaitError>();
        assert!(classifier.is_retryable(&*err));

        let classifier = RetryClassifier::empty()
            .add_matcher("lock wait", |e| e.to_string().starts_with("lock wait"));
        assert!(classifier.is_retryable(&*err));
    }
}
