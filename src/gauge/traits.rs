//! Gauge store trait definition
//!
//! The `GaugeStore` trait is the only shared mutable resource between the
//! ingest path and the query path. Implementations must provide atomic
//! per-key upsert and read; no client-side locking is layered on top.

use async_trait::async_trait;

use super::error::StoreError;
use super::key::GaugeKey;

/// TTL-bounded gauge storage (redis, memory)
#[async_trait]
pub trait GaugeStore: Send + Sync {
    /// Upsert a gauge and restart its freshness window.
    ///
    /// Last physical write wins; nothing about the value's origin is used to
    /// order writes.
    async fn write(&self, key: &GaugeKey, value: f64) -> Result<(), StoreError>;

    /// Read a gauge.
    ///
    /// Returns `Ok(None)` both when the key was never written and when its
    /// freshness window has elapsed. Backend failures are errors, never `None`.
    async fn read(&self, key: &GaugeKey) -> Result<Option<f64>, StoreError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Short backend name for logs and metrics labels
    fn backend_name(&self) -> &'static str;
}
