//! Memory gauge store
//!
//! Process-local `GaugeStore` backed by moka. Every entry shares the same
//! time-to-live, which is exactly the fixed freshness window the store
//! contract asks for: moka treats an expired entry as absent on read even
//! before it is evicted.

use async_trait::async_trait;
use std::time::Duration;

use super::error::StoreError;
use super::key::{format_key, validate_key, GaugeKey};
use super::traits::GaugeStore;

/// Upper bound on tracked gauges; one per live instance is expected.
const MAX_ENTRIES: u64 = 100_000;

/// MemoryGaugeStore wraps moka for the GaugeStore trait
pub struct MemoryGaugeStore {
    cache: moka::future::Cache<String, f64>,
    context: String,
    ttl: Duration,
}

impl MemoryGaugeStore {
    /// Create a store whose entries expire `ttl` after their last write
    pub fn new(context: impl Into<String>, ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            context: context.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of live entries (approximate, for diagnostics)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Forces moka to process pending expirations
    pub async fn run_pending(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl GaugeStore for MemoryGaugeStore {
    async fn write(&self, key: &GaugeKey, value: f64) -> Result<(), StoreError> {
        validate_key(key).map_err(StoreError::InvalidKey)?;
        // insert() replaces the entry, which restarts its time-to-live
        self.cache.insert(format_key(&self.context, key), value).await;
        Ok(())
    }

    async fn read(&self, key: &GaugeKey) -> Result<Option<f64>, StoreError> {
        validate_key(key).map_err(StoreError::InvalidKey)?;
        Ok(self.cache.get(&format_key(&self.context, key)).await)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
