// Redis gauge store module
//
// Shared-backend implementation of `GaugeStore`. Every replica of this
// service points at the same Redis, so an ingest stream landing on one
// replica is visible to queries served by another.

mod store;

pub use store::RedisGaugeStore;
