//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
///
/// All counters use `Relaxed` ordering; readers only need eventual values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    rows_returned: AtomicU64,
    entities_created: AtomicU64,
    entities_updated: AtomicU64,
    entities_deleted: AtomicU64,
    audit_records_written: AtomicU64,
    audit_amendments: AtomicU64,
    /// Entity writes whose audit record could not be persisted
    audit_write_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Queries

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_returned(&self, rows: u64) {
        self.rows_returned.fetch_add(rows, Ordering::Relaxed);
    }

    // Entity writes

    pub fn add_entities_created(&self, count: u64) {
        self.entities_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_entities_updated(&self, count: u64) {
        self.entities_updated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_entities_deleted(&self, count: u64) {
        self.entities_deleted.fetch_add(count, Ordering::Relaxed);
    }

    // Audit trail

    pub fn increment_audit_records(&self) {
        self.audit_records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_audit_amendments(&self) {
        self.audit_amendments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_audit_write_failures(&self) {
        self.audit_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn audit_write_failures(&self) -> u64 {
        self.audit_write_failures.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            entities_created: self.entities_created.load(Ordering::Relaxed),
            entities_updated: self.entities_updated.load(Ordering::Relaxed),
            entities_deleted: self.entities_deleted.load(Ordering::Relaxed),
            audit_records_written: self.audit_records_written.load(Ordering::Relaxed),
            audit_amendments: self.audit_amendments.load(Ordering::Relaxed),
            audit_write_failures: self.audit_write_failures.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub rows_returned: u64,
    pub entities_created: u64,
    pub entities_updated: u64,
    pub entities_deleted: u64,
    pub audit_records_written: u64,
    pub audit_amendments: u64,
    pub audit_write_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let metrics = MetricsRegistry::new();
        metrics.increment_queries_executed();
        metrics.add_rows_returned(7);
        metrics.add_entities_created(2);
        metrics.increment_audit_write_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.rows_returned, 7);
        assert_eq!(snapshot.entities_created, 2);
        assert_eq!(metrics.audit_write_failures(), 1);
    }

    #[test]
    fn test_to_json() {
        let metrics = MetricsRegistry::new();
        metrics.increment_audit_records();
        let json = metrics.to_json();
        assert_eq!(json["audit_records_written"], 1);
        assert_eq!(json["queries_rejected"], 0);
    }

    #[test]
    fn test_thread_safety() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_queries_executed();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().queries_executed, 1000);
    }
}
