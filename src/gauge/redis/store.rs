// Redis gauge store implementation
//
// SET key value EX ttl / GET key over a multiplexed ConnectionManager.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::gauge::config::StoreConfig;
use crate::gauge::error::StoreError;
use crate::gauge::key::{format_key, validate_key, GaugeKey};
use crate::gauge::serialization::{decode_value, encode_value};
use crate::gauge::traits::GaugeStore;
use crate::metrics::ActivescaleMetrics;

const BACKEND: &str = "redis";

/// Redis-based gauge store
///
/// - Async connection multiplexing via ConnectionManager (reconnects on its own)
/// - Fixed TTL on every write
/// - Per-operation timeout; a slow backend is reported, not waited on
pub struct RedisGaugeStore {
    /// Redis connection manager (async, multiplexed)
    connection: ConnectionManager,

    /// Keyspace prefix for every gauge
    context: String,

    /// Freshness window applied to every write
    ttl: Duration,

    operation_timeout: Duration,
}

impl RedisGaugeStore {
    /// Connects to Redis and returns a ready store
    ///
    /// # Errors
    ///
    /// - `StoreError::Configuration` if the URL is invalid or the CA file
    ///   cannot be read
    /// - `StoreError::ConnectionFailed` if the server cannot be reached within
    ///   the connection timeout
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = build_client(config)?;

        let connection = tokio::time::timeout(
            config.connection_timeout(),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            StoreError::ConnectionFailed(format!(
                "no answer from {} within {:?}",
                config.redis_addr,
                config.connection_timeout()
            ))
        })?
        .map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!(
            redis_addr = %config.redis_addr,
            tls = config.tls.enabled,
            context = %config.context,
            ttl_ms = config.ttl.as_millis() as u64,
            "Redis gauge store connected"
        );

        Ok(Self {
            connection,
            context: config.context.clone(),
            ttl: config.ttl,
            operation_timeout: config.operation_timeout(),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Runs one backend operation under the operation timeout and records
    /// its duration and failures.
    async fn timed<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        let metrics = ActivescaleMetrics::global();
        let started = Instant::now();

        let result = match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::from(e)),
            Err(_) => Err(StoreError::Timeout(self.operation_timeout)),
        };

        metrics
            .store_operation_duration
            .with_label_values(&[BACKEND, operation])
            .observe(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics
                .store_errors
                .with_label_values(&[BACKEND, operation])
                .inc();
        }
        result
    }
}

/// Build a redis client honoring TLS and CA override settings
fn build_client(config: &StoreConfig) -> Result<Client, StoreError> {
    let url = config.redis_url();

    match (&config.tls.ca_file, config.tls.enabled) {
        (Some(ca_file), true) => {
            let root_cert = std::fs::read(ca_file).map_err(|e| {
                StoreError::Configuration(format!(
                    "Failed to read CA file {}: {}",
                    ca_file.display(),
                    e
                ))
            })?;
            Client::build_with_tls(
                url.as_str(),
                redis::TlsCertificates {
                    client_tls: None,
                    root_cert: Some(root_cert),
                },
            )
            .map_err(|e| StoreError::Configuration(format!("Invalid Redis TLS setup: {}", e)))
        }
        _ => Client::open(url.as_str())
            .map_err(|e| StoreError::Configuration(format!("Invalid Redis URL: {}", e))),
    }
}

/// Build the SET command with the freshness window.
///
/// Whole-second windows use `EX`; anything finer falls back to `PX`.
fn set_command(key: &str, value: f64, ttl: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(encode_value(value));
    if ttl.subsec_nanos() == 0 {
        cmd.arg("EX").arg(ttl.as_secs());
    } else {
        cmd.arg("PX").arg(ttl.as_millis() as u64);
    }
    cmd
}

#[async_trait]
impl GaugeStore for RedisGaugeStore {
    async fn write(&self, key: &GaugeKey, value: f64) -> Result<(), StoreError> {
        validate_key(key).map_err(StoreError::InvalidKey)?;
        let formatted = format_key(&self.context, key);
        let cmd = set_command(&formatted, value, self.ttl);

        let mut conn = self.connection.clone();
        self.timed("write", async move {
            let _: () = cmd.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn read(&self, key: &GaugeKey) -> Result<Option<f64>, StoreError> {
        validate_key(key).map_err(StoreError::InvalidKey)?;
        let formatted = format_key(&self.context, key);

        let mut conn = self.connection.clone();
        let get_key = formatted.clone();
        let raw: Option<String> = self
            .timed("read", async move {
                redis::cmd("GET").arg(&get_key).query_async(&mut conn).await
            })
            .await?;

        match raw {
            Some(raw) => decode_value(&formatted, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: String = self
            .timed("ping", async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

// Verify Send + Sync bounds (required for Arc<dyn GaugeStore>)
fn _assert_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<RedisGaugeStore>();
    assert_sync::<RedisGaugeStore>();
}
