//! Process-wide reconciliation counters.
//!
//! Counters are bumped at the call site without logging. [`Metrics::flush`]
//! emits every value as one `tracing::info!` event; [`Metrics::snapshot`]
//! reads them for hosts that export metrics themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    events_seen: AtomicU64,
    reconciliations: AtomicU64,
    favorites_added: AtomicU64,
    changeset_retries: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub events_seen: u64,
    pub reconciliations: u64,
    pub favorites_added: u64,
    pub changeset_retries: u64,
    pub failures: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_seen: AtomicU64::new(0),
            reconciliations: AtomicU64::new(0),
            favorites_added: AtomicU64::new(0),
            changeset_retries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// A checkout event arrived, whether or not it qualified.
    pub fn inc_events_seen(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// An event passed the trigger gate.
    pub fn inc_reconciliations(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_favorites_added(&self) {
        self.favorites_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_changeset_retries(&self) {
        self.changeset_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// A changelog read, parse or favorite write failed.
    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            favorites_added: self.favorites_added.load(Ordering::Relaxed),
            changeset_retries: self.changeset_retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            metric = "flush",
            events_seen = snapshot.events_seen,
            reconciliations = snapshot.reconciliations,
            favorites_added = snapshot.favorites_added,
            changeset_retries = snapshot.changeset_retries,
            failures = snapshot.failures,
        );
    }

    pub fn reset(&self) {
        self.events_seen.store(0, Ordering::Relaxed);
        self.reconciliations.store(0, Ordering::Relaxed);
        self.favorites_added.store(0, Ordering::Relaxed);
        self.changeset_retries.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}
