// Rolling ingest counters
//
// Incremented with relaxed atomics on the receive path, swapped to zero by the
// summary task. Owned by the IngestServer that created them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::summary::Summarize;

/// Counters covering one summary interval
#[derive(Debug, Default)]
pub struct IngestCounters {
    batches: AtomicU64,
    accepted: AtomicU64,
    dropped_identity: AtomicU64,
    dropped_name: AtomicU64,
    ignored_type: AtomicU64,
    write_errors: AtomicU64,
}

/// Values taken from `IngestCounters` at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSnapshot {
    /// Batches received
    pub batches: u64,
    /// Gauge samples written to the store
    pub accepted: u64,
    /// Metric families dropped because the stream had no identity yet
    pub dropped_identity: u64,
    /// Metric families dropped because their name is not tracked
    pub dropped_name: u64,
    /// Non-gauge samples inside the tracked family
    pub ignored_type: u64,
    /// Gauge samples the store rejected
    pub write_errors: u64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_dropped_identity(&self, families: u64) {
        self.dropped_identity.fetch_add(families, Ordering::Relaxed);
    }

    pub fn add_dropped_name(&self) {
        self.dropped_name.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_ignored_type(&self) {
        self.ignored_type.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counters without resetting them
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_identity: self.dropped_identity.load(Ordering::Relaxed),
            dropped_name: self.dropped_name.load(Ordering::Relaxed),
            ignored_type: self.ignored_type.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }

    /// Read and reset every counter
    pub fn take(&self) -> IngestSnapshot {
        IngestSnapshot {
            batches: self.batches.swap(0, Ordering::Relaxed),
            accepted: self.accepted.swap(0, Ordering::Relaxed),
            dropped_identity: self.dropped_identity.swap(0, Ordering::Relaxed),
            dropped_name: self.dropped_name.swap(0, Ordering::Relaxed),
            ignored_type: self.ignored_type.swap(0, Ordering::Relaxed),
            write_errors: self.write_errors.swap(0, Ordering::Relaxed),
        }
    }
}

impl Summarize for IngestCounters {
    fn log_and_reset(&self, interval: Duration) {
        let s = self.take();
        tracing::info!(
            interval_secs = interval.as_secs_f64(),
            batches = s.batches,
            accepted = s.accepted,
            dropped_identity = s.dropped_identity,
            dropped_name = s.dropped_name,
            ignored_type = s.ignored_type,
            write_errors = s.write_errors,
            "Ingest summary"
        );
    }
}
