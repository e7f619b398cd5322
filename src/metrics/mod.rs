// Metrics module - Prometheus metrics for the ingest and query paths
//
// Complements the periodic summary log lines: the summaries reset every
// interval, these counters are monotonic and scraped from /metrics.

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;

/// Process-wide metrics registry
pub struct ActivescaleMetrics {
    /// Telemetry batches received over all streams
    pub ingest_batches: IntCounter,

    /// Ingest outcomes: accepted, dropped_identity, dropped_name,
    /// ignored_type, write_error
    pub ingest_records: IntCounterVec,

    /// Currently open ingest streams
    pub ingest_active_streams: IntGauge,

    /// Store operation duration by backend and operation (write, read, ping)
    pub store_operation_duration: HistogramVec,

    /// Store operation failures by backend and operation
    pub store_errors: IntCounterVec,

    /// Query calls by kind (selector, name) and outcome
    pub query_requests: IntCounterVec,

    /// Items returned by successful queries
    pub query_items: IntCounter,
}

static METRICS: OnceLock<ActivescaleMetrics> = OnceLock::new();

impl ActivescaleMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Registration happens on first use; later calls return the same
    /// instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let ingest_batches = register_int_counter!(
                "activescale_ingest_batches_total",
                "Telemetry batches received from proxy streams"
            )
            .expect("Failed to register ingest_batches_total metric");

            let ingest_records = register_int_counter_vec!(
                "activescale_ingest_records_total",
                "Ingested records by outcome",
                &["outcome"]
            )
            .expect("Failed to register ingest_records_total metric");

            let ingest_active_streams = register_int_gauge!(
                "activescale_ingest_active_streams",
                "Currently open telemetry streams"
            )
            .expect("Failed to register ingest_active_streams metric");

            let store_operation_duration = register_histogram_vec!(
                "activescale_store_operation_duration_seconds",
                "Duration of gauge store operations in seconds",
                &["backend", "operation"],
                vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0]
            )
            .expect("Failed to register store_operation_duration_seconds metric");

            let store_errors = register_int_counter_vec!(
                "activescale_store_errors_total",
                "Failed gauge store operations",
                &["backend", "operation"]
            )
            .expect("Failed to register store_errors_total metric");

            let query_requests = register_int_counter_vec!(
                "activescale_query_requests_total",
                "Custom metrics queries by kind and outcome",
                &["kind", "outcome"]
            )
            .expect("Failed to register query_requests_total metric");

            let query_items = register_int_counter!(
                "activescale_query_items_total",
                "Metric values returned by successful queries"
            )
            .expect("Failed to register query_items_total metric");

            ActivescaleMetrics {
                ingest_batches,
                ingest_records,
                ingest_active_streams,
                store_operation_duration,
                store_errors,
                query_requests,
                query_items,
            }
        })
    }

    /// Record one ingest outcome
    pub fn record_ingest(&self, outcome: &str, count: u64) {
        if count > 0 {
            self.ingest_records.with_label_values(&[outcome]).inc_by(count);
        }
    }

    /// Record one query outcome
    pub fn record_query(&self, kind: &str, outcome: &str) {
        self.query_requests.with_label_values(&[kind, outcome]).inc();
    }
}

/// Encode every registered metric in the Prometheus text format
pub fn export_text() -> String {
    // Make sure our collectors exist even before the first event.
    ActivescaleMetrics::global();

    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
