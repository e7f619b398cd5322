//! Telemetry ingest
//!
//! Accepts long-lived client-streaming connections from proxy sidecars
//! speaking the Envoy metrics service protocol, and writes the one tracked
//! gauge of every identified stream into the gauge store.
//!
//! ```text
//! proxy ──StreamMetrics──▶ MetricsSink ──▶ IngestServer::consume
//!                                            ├─ IdentityResolver (once per stream)
//!                                            └─ GaugeStore::write (per gauge sample)
//! ```

pub mod config;
pub mod counters;
pub mod proto;
pub mod server;
pub mod service;

pub use config::IngestConfig;
pub use counters::{IngestCounters, IngestSnapshot};
pub use server::{IngestServer, IngestSettings};
pub use service::MetricsSink;
