//! Named breaker state storage.
//!
//! # Responsibilities
//! - Own the mutable state of every circuit breaker, keyed by service name
//! - Provide atomic read-modify-write access to one record at a time
//!
//! # Design Decisions
//! - `CircuitBreaker` values are thin accessors (name + config); two breakers
//!   built with the same name on the same store observe the same state
//! - `BreakerStore` is the seam for sharing state across processes; the
//!   in-process `BreakerRegistry` is backed by `DashMap`
//! - A record is locked only for the duration of the update closure, never
//!   while a guarded operation runs

use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

use crate::resilience::circuit_breaker::BreakerRecord;

/// Storage backend for breaker records.
pub trait BreakerStore: Send + Sync {
    /// Atomically apply `f` to the record for `service`, creating a closed
    /// record if none exists.
    fn update(&self, service: &str, f: &mut dyn FnMut(&mut BreakerRecord));

    /// Copy of the current record, without applying any transition.
    fn snapshot(&self, service: &str) -> BreakerRecord;

    /// Names of every service with a record.
    fn services(&self) -> Vec<String>;
}

static GLOBAL: OnceLock<Arc<BreakerRegistry>> = OnceLock::new();

/// In-process breaker store.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    inner: DashMap<String, BreakerRecord>,
}

impl BreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by `CircuitBreaker::new`.
    pub fn global() -> Arc<BreakerRegistry> {
        GLOBAL.get_or_init(|| Arc::new(BreakerRegistry::new())).clone()
    }

    /// Drop the record for `service`. Returns true if one existed.
    pub fn remove(&self, service: &str) -> bool {
        self.inner.remove(service).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl BreakerStore for BreakerRegistry {
    fn update(&self, service: &str, f: &mut dyn FnMut(&mut BreakerRecord)) {
        if let Some(mut record) = self.inner.get_mut(service) {
            f(record.value_mut());
            return;
        }
        let mut record = self.inner.entry(service.to_string()).or_default();
        f(record.value_mut());
    }

    fn snapshot(&self, service: &str) -> BreakerRecord {
        self.inner
            .get(service)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    fn services(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }
}
