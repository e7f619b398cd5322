//! Gauge store module
//!
//! A TTL-keyed numeric store shared by the ingest path (writer) and the query
//! path (reader). The store owns the key scheme and the freshness contract:
//!
//! - a write upserts the value and restarts its freshness window
//! - a read after the window has elapsed reports absence, exactly like a key
//!   that was never written
//! - backend failures are errors and are never folded into absence
//!
//! # Architecture
//!
//! ```text
//! GaugeStore (trait)
//!   ├── RedisGaugeStore  (shared backend, SET EX / GET)
//!   └── MemoryGaugeStore (moka, single replica / development)
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod redis;
pub mod serialization;
pub mod traits;

use std::sync::Arc;

pub use config::{RedisTlsConfig, StoreBackend, StoreConfig};
pub use error::StoreError;
pub use key::GaugeKey;
pub use memory::MemoryGaugeStore;
pub use self::redis::RedisGaugeStore;
pub use traits::GaugeStore;

/// Build the configured store backend
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn GaugeStore>, StoreError> {
    match config.backend {
        StoreBackend::Redis => Ok(Arc::new(RedisGaugeStore::connect(config).await?)),
        StoreBackend::Memory => {
            tracing::warn!(
                "Using in-process gauge store; values are not shared between replicas"
            );
            Ok(Arc::new(MemoryGaugeStore::new(
                config.context.clone(),
                config.ttl,
            )))
        }
    }
}
