// Constants module - centralized default values for configuration
//
// Every default in this file mirrors an environment variable or YAML key
// documented in `config`. Keep the two in sync.

use std::time::Duration;

// =============================================================================
// Store defaults
// =============================================================================

/// Default backend address (host:port)
pub const DEFAULT_REDIS_ADDR: &str = "redis:6379";

/// Default keyspace context prefix
pub const DEFAULT_REDIS_CONTEXT: &str = "activescale:tcn";

/// Default freshness window for a written gauge
pub const DEFAULT_METRIC_TTL: Duration = Duration::from_secs(20);

/// Default name the gauge is stored and served under
pub const DEFAULT_GAUGE_NAME: &str = "active_requests";

/// Default backend connection timeout in milliseconds
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5000;

/// Default backend operation timeout in milliseconds
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 2000;

// =============================================================================
// Ingest defaults
// =============================================================================

/// Default gRPC listen port for the metrics sink
pub const DEFAULT_GRPC_PORT: u16 = 9000;

/// Default upstream metric family tracked by the ingest path
pub const DEFAULT_METRIC_NAME: &str = "http.stats.downstream_rq_active";

/// Default interval between summary log lines
pub const DEFAULT_SUMMARY_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Query defaults
// =============================================================================

/// Default listen address for the custom metrics API
pub const DEFAULT_QUERY_ADDRESS: &str = "0.0.0.0:6443";

/// Default deadline for a single query (lookup plus store reads)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// API group/version served by the query API
pub const CUSTOM_METRICS_GROUP_VERSION: &str = "custom.metrics.k8s.io/v1beta2";

// =============================================================================
// Health defaults
// =============================================================================

/// Default listen address for liveness/readiness/metrics
pub const DEFAULT_HEALTH_ADDRESS: &str = "0.0.0.0:18080";

/// Time open gRPC connections get to close after shutdown is signalled
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadline for readiness probes against the store and the lookup
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Lookup defaults
// =============================================================================

/// Service account token mounted into every pod
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Cluster CA mounted into every pod
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Default timeout for a single Kubernetes API request in milliseconds
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5000;
