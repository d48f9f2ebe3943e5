//! Shared utilities for integration testing.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilience_kit::resilience::{BoxError, TransientError};

/// A dependency that fails transiently a fixed number of times, then succeeds.
#[derive(Clone)]
pub struct FlakyDependency {
    calls: Arc<AtomicU32>,
    failures: u32,
    latency: Duration,
}

impl FlakyDependency {
    pub fn new(failures: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
            latency: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// One invocation of the dependency.
    pub fn invoke(&self) -> impl Future<Output = Result<&'static str, BoxError>> + Send + 'static {
        let calls = self.calls.clone();
        let failures = self.failures;
        let latency = self.latency;
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if n < failures {
                Err(BoxError::from(TransientError::new(
                    "SQLSTATE[HY000] [2002] Connection refused",
                )))
            } else {
                Ok("ok")
            }
        }
    }
}

/// Unique service name so parallel tests never share global breaker state.
#[allow(dead_code)]
pub fn service_name(prefix: &str) -> String {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    format!("{}-{}", prefix, NEXT.fetch_add(1, Ordering::SeqCst))
}
