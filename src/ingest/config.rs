// Ingest configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::constants::{DEFAULT_GRPC_PORT, DEFAULT_METRIC_NAME, DEFAULT_SUMMARY_INTERVAL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bind address for the gRPC listener (default: 0.0.0.0)
    #[serde(default = "default_address")]
    pub address: String,

    /// gRPC listen port (default: 9000)
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// Upstream metric family to store; matched exactly
    /// (default: "http.stats.downstream_rq_active")
    #[serde(default = "default_metric_name")]
    pub metric_name: String,

    /// Interval between ingest and query summary lines (default: 30s)
    #[serde(default = "default_summary_interval", with = "humantime_serde")]
    pub summary_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            grpc_port: default_grpc_port(),
            metric_name: default_metric_name(),
            summary_interval: default_summary_interval(),
        }
    }
}

impl IngestConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.address, self.grpc_port)
            .parse()
            .map_err(|e| format!("Invalid ingest listen address: {}", e))
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    DEFAULT_GRPC_PORT
}

fn default_metric_name() -> String {
    DEFAULT_METRIC_NAME.to_string()
}

fn default_summary_interval() -> Duration {
    DEFAULT_SUMMARY_INTERVAL
}
