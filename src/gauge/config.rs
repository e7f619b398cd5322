// Gauge store configuration module

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_GAUGE_NAME, DEFAULT_METRIC_TTL,
    DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_REDIS_ADDR, DEFAULT_REDIS_CONTEXT,
};

/// Which backend holds the gauges
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis (or compatible) server. Required when more than one
    /// replica of this service runs.
    #[default]
    Redis,
    /// Process-local store. Only meaningful for single-replica setups and
    /// local development.
    Memory,
}

/// TLS settings for the Redis connection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RedisTlsConfig {
    /// Connect with TLS (`rediss://`)
    #[serde(default)]
    pub enabled: bool,

    /// Skip server certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// PEM bundle to trust instead of the system roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
}

/// Gauge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind (default: redis)
    #[serde(default)]
    pub backend: StoreBackend,

    /// Backend address, either `host:port` or a full `redis://` URL
    #[serde(default = "default_redis_addr")]
    pub redis_addr: String,

    /// Optional password for Redis authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_password: Option<String>,

    /// Redis database number (default: 0)
    #[serde(default)]
    pub redis_db: u32,

    /// Keyspace prefix isolating this deployment (default: "activescale:tcn")
    #[serde(default = "default_context")]
    pub context: String,

    /// Freshness window of a written gauge (default: 20s)
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Name the gauge is stored and served under (default: "active_requests")
    #[serde(default = "default_gauge_name")]
    pub gauge_name: String,

    #[serde(default)]
    pub tls: RedisTlsConfig,

    /// Connection timeout in milliseconds (default: 5000)
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Operation timeout in milliseconds (default: 2000)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_addr: default_redis_addr(),
            redis_password: None,
            redis_db: 0,
            context: default_context(),
            ttl: default_ttl(),
            gauge_name: default_gauge_name(),
            tls: RedisTlsConfig::default(),
            connection_timeout_ms: default_connection_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Build the connection URL handed to the redis client.
    ///
    /// A `redis_addr` that already carries a scheme is used verbatim.
    pub fn redis_url(&self) -> String {
        if self.redis_addr.contains("://") {
            return self.redis_addr.clone();
        }

        let scheme = if self.tls.enabled { "rediss" } else { "redis" };
        let auth = match &self.redis_password {
            Some(password) if !password.is_empty() => {
                format!(":{}@", urlencoding::encode(password))
            }
            _ => String::new(),
        };
        let mut url = format!(
            "{}://{}{}/{}",
            scheme, auth, self.redis_addr, self.redis_db
        );
        if self.tls.enabled && self.tls.insecure {
            url.push_str("#insecure");
        }
        url
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_redis_addr() -> String {
    DEFAULT_REDIS_ADDR.to_string()
}

fn default_context() -> String {
    DEFAULT_REDIS_CONTEXT.to_string()
}

fn default_ttl() -> Duration {
    DEFAULT_METRIC_TTL
}

fn default_gauge_name() -> String {
    DEFAULT_GAUGE_NAME.to_string()
}

fn default_connection_timeout_ms() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_MS
}

fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_MS
}
