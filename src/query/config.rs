// Query path configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_QUERY_ADDRESS, DEFAULT_QUERY_TIMEOUT,
    SERVICE_ACCOUNT_CA_PATH, SERVICE_ACCOUNT_TOKEN_PATH,
};

/// Custom metrics API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Listen address (default: 0.0.0.0:6443)
    #[serde(default = "default_address")]
    pub address: String,

    /// Deadline for one query, lookup and store reads included (default: 10s)
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout: default_timeout(),
        }
    }
}

/// Where candidate instances for selector queries come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupBackend {
    /// Pods listed through the Kubernetes API
    #[default]
    Kubernetes,
    /// Fixed instance list from this file
    Static,
}

/// One statically registered instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticInstanceConfig {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Instance lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub backend: LookupBackend,

    /// API server base URL. Defaults to the in-cluster address from
    /// KUBERNETES_SERVICE_HOST / KUBERNETES_SERVICE_PORT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server: Option<String>,

    /// Bearer token file (default: service account token)
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// CA bundle for the API server (default: service account CA)
    #[serde(default = "default_ca_file")]
    pub ca_file: PathBuf,

    /// Skip API server certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// Per-request timeout in milliseconds (default: 5000)
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,

    /// Instances served by the static backend
    #[serde(default)]
    pub instances: Vec<StaticInstanceConfig>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: LookupBackend::default(),
            api_server: None,
            token_file: default_token_file(),
            ca_file: default_ca_file(),
            insecure: false,
            timeout_ms: default_lookup_timeout_ms(),
            instances: Vec::new(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_address() -> String {
    DEFAULT_QUERY_ADDRESS.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_QUERY_TIMEOUT
}

fn default_token_file() -> PathBuf {
    PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH)
}

fn default_ca_file() -> PathBuf {
    PathBuf::from(SERVICE_ACCOUNT_CA_PATH)
}

fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}
