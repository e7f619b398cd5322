// Configuration module
//
// Sources, later ones winning:
//   1. built-in defaults (crate::constants)
//   2. optional YAML file, with ${VAR} substitution
//   3. environment variables (REDIS_ADDR, METRIC_TTL, ...)
//   4. command line flags

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::DEFAULT_HEALTH_ADDRESS;
use crate::gauge::StoreConfig;
use crate::ingest::IngestConfig;
use crate::logging::LoggingConfig;
use crate::query::{LookupBackend, LookupConfig, QueryConfig};

/// Probe and metrics listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Listen address (default: 0.0.0.0:18080)
    #[serde(default = "default_health_address")]
    pub address: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            address: default_health_address(),
        }
    }
}

fn default_health_address() -> String {
    DEFAULT_HEALTH_ADDRESS.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command line values that override every other source
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub redis_addr: Option<String>,
    pub ttl: Option<Duration>,
    pub grpc_port: Option<u16>,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });
        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load from an optional file, then apply the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides read through `env`.
    ///
    /// Empty values count as unset. Values that fail to parse are errors,
    /// not silently ignored.
    pub fn apply_env_overrides<F>(&mut self, env: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(v) = get("REDIS_ADDR") {
            self.store.redis_addr = v;
        }
        if let Some(v) = get("REDIS_CONTEXT") {
            self.store.context = v;
        }
        if let Some(v) = get("METRIC_TTL") {
            self.store.ttl = parse_env_duration("METRIC_TTL", &v)?;
        }
        if let Some(v) = get("REDIS_TLS") {
            self.store.tls.enabled = parse_env_bool("REDIS_TLS", &v)?;
        }
        if let Some(v) = get("REDIS_TLS_INSECURE") {
            self.store.tls.insecure = parse_env_bool("REDIS_TLS_INSECURE", &v)?;
        }
        if let Some(v) = get("REDIS_CA_FILE") {
            self.store.tls.ca_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("REDIS_PASSWORD") {
            self.store.redis_password = Some(v);
        }
        if let Some(v) = get("GRPC_PORT") {
            self.ingest.grpc_port = v
                .parse()
                .map_err(|e| format!("invalid GRPC_PORT '{}': {}", v, e))?;
        }
        if let Some(v) = get("METRIC_NAME") {
            self.ingest.metric_name = v;
        }
        if let Some(v) = get("LOG_METRICS_SUMMARY_INTERVAL") {
            self.ingest.summary_interval = parse_env_duration("LOG_METRICS_SUMMARY_INTERVAL", &v)?;
        }
        if let Some(v) = get("LOG_VERBOSITY") {
            self.logging.verbosity = v
                .parse()
                .map_err(|e| format!("invalid LOG_VERBOSITY '{}': {}", v, e))?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(addr) = &cli.redis_addr {
            self.store.redis_addr = addr.clone();
        }
        if let Some(ttl) = cli.ttl {
            self.store.ttl = ttl;
        }
        if let Some(port) = cli.grpc_port {
            self.ingest.grpc_port = port;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        // Redis expiry has millisecond resolution; anything shorter becomes PX 0
        if self.store.ttl < Duration::from_millis(1) {
            return Err(format!(
                "store.ttl must be at least 1ms (got {:?})",
                self.store.ttl
            ));
        }
        if self.store.context.trim().is_empty() {
            return Err("store.context cannot be empty".to_string());
        }
        if self.store.context.contains(char::is_whitespace) {
            return Err(format!(
                "store.context '{}' cannot contain whitespace",
                self.store.context
            ));
        }
        if self.store.gauge_name.trim().is_empty() {
            return Err("store.gauge_name cannot be empty".to_string());
        }
        if self.store.redis_addr.trim().is_empty() {
            return Err("store.redis_addr cannot be empty".to_string());
        }
        if self.store.operation_timeout_ms == 0 {
            return Err("store.operation_timeout_ms must be greater than zero".to_string());
        }
        if self.store.connection_timeout_ms == 0 {
            return Err("store.connection_timeout_ms must be greater than zero".to_string());
        }

        if self.ingest.metric_name.trim().is_empty() {
            return Err("ingest.metric_name cannot be empty".to_string());
        }
        if self.ingest.summary_interval.is_zero() {
            return Err("ingest.summary_interval must be greater than zero".to_string());
        }
        if self.ingest.grpc_port == 0 {
            return Err("ingest.grpc_port must be greater than zero".to_string());
        }
        self.ingest.listen_addr()?;

        if self.query.timeout.is_zero() {
            return Err("query.timeout must be greater than zero".to_string());
        }
        if self.lookup.timeout_ms == 0 {
            return Err("lookup.timeout_ms must be greater than zero".to_string());
        }
        if self.lookup.backend == LookupBackend::Static {
            for instance in &self.lookup.instances {
                if instance.namespace.is_empty() || instance.name.is_empty() {
                    return Err(
                        "lookup.instances entries need both namespace and name".to_string()
                    );
                }
            }
        }

        Ok(())
    }
}

fn parse_env_duration(key: &str, value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| format!("invalid {}: {}", key, e))
}

/// Same spellings as Go's strconv.ParseBool, which the deployment
/// manifests were written against
fn parse_env_bool(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("invalid {} '{}': expected a boolean", key, value)),
    }
}
