// Configuration loading through the public API

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

use activescale::config::{CliOverrides, Config};
use activescale::gauge::StoreBackend;
use activescale::logging::LogFormat;
use activescale::query::LookupBackend;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
store:
  backend: redis
  redis_addr: "redis.cache:6380"
  context: "activescale:prod"
  ttl: "1m30s"
  gauge_name: "active_requests"
  tls:
    enabled: true
    ca_file: "/etc/redis/ca.pem"
ingest:
  grpc_port: 9100
  metric_name: "http.stats.downstream_rq_active"
  summary_interval: "10s"
query:
  address: "0.0.0.0:8443"
  timeout: "3s"
lookup:
  backend: kubernetes
  api_server: "https://kubernetes.default.svc"
  timeout_ms: 2000
health:
  address: "0.0.0.0:18081"
logging:
  format: text
  verbosity: 3
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.store.backend, StoreBackend::Redis);
    assert_eq!(config.store.ttl, Duration::from_secs(90));
    assert!(config.store.tls.enabled);
    assert_eq!(config.store.tls.ca_file, Some(PathBuf::from("/etc/redis/ca.pem")));
    assert_eq!(config.store.redis_url(), "rediss://redis.cache:6380/0");
    assert_eq!(config.ingest.summary_interval, Duration::from_secs(10));
    assert_eq!(config.query.timeout, Duration::from_secs(3));
    assert_eq!(config.lookup.backend, LookupBackend::Kubernetes);
    assert_eq!(config.lookup.timeout(), Duration::from_secs(2));
    assert_eq!(config.health.address, "0.0.0.0:18081");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.logging.verbosity, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_duration_in_file() {
    let file = write_config("store:\n  ttl: \"twenty seconds\"\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_unknown_backend_in_file() {
    let file = write_config("store:\n  backend: memcached\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_precedence_file_then_env_then_cli() {
    let file = write_config("store:\n  redis_addr: \"from-file:6379\"\n  context: \"from-file\"\n");
    let mut config = Config::from_file(file.path()).unwrap();

    config
        .apply_env_overrides(|key| match key {
            "REDIS_ADDR" => Some("from-env:6379".to_string()),
            "METRIC_TTL" => Some("5s".to_string()),
            _ => None,
        })
        .unwrap();
    config.apply_cli(&CliOverrides {
        redis_addr: Some("from-cli:6379".to_string()),
        ..Default::default()
    });

    assert_eq!(config.store.redis_addr, "from-cli:6379");
    assert_eq!(config.store.context, "from-file");
    assert_eq!(config.store.ttl, Duration::from_secs(5));
}

#[test]
fn test_serialized_config_loads_back() {
    let mut config = Config::default();
    config.store.ttl = Duration::from_millis(1500);
    config.ingest.summary_interval = Duration::from_secs(45);

    let yaml = serde_yaml::to_string(&config).unwrap();
    let loaded = Config::from_yaml_with_env(&yaml).unwrap();
    assert_eq!(loaded.store.ttl, Duration::from_millis(1500));
    assert_eq!(loaded.ingest.summary_interval, Duration::from_secs(45));
}
