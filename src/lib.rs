// Activescale library
//
// Push-to-pull bridge: proxy telemetry streams in, custom metrics queries out.

pub mod api;
pub mod config;
pub mod constants;
pub mod gauge;
pub mod identity;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod query;
pub mod server;
pub mod summary;
