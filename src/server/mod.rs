// Server module - wires the store, ingest, query and health listeners
//
// All three listeners share one shutdown signal. Summary tasks are owned here
// and aborted once the listeners have drained.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::constants::SHUTDOWN_DRAIN_TIMEOUT;
use crate::gauge::{self, GaugeStore, StoreError};
use crate::identity::IdentityResolver;
use crate::ingest::proto::service::metrics_service_server::MetricsServiceServer;
use crate::ingest::{IngestServer, IngestSettings, MetricsSink};
use crate::query::{self, InstanceLookup, LookupError, QueryService};
use crate::summary::spawn_summary_task;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("failed to bind {what} listener on {address}: {source}")]
    Bind {
        what: &'static str,
        address: String,
        source: std::io::Error,
    },

    #[error("gRPC server failed: {0}")]
    Grpc(#[from] tonic::transport::Error),

    #[error("{what} server failed: {source}")]
    Http {
        what: &'static str,
        source: std::io::Error,
    },
}

/// Bound sockets for the three listeners
pub struct Listeners {
    pub ingest: TcpListener,
    pub query: TcpListener,
    pub health: TcpListener,
}

impl Listeners {
    /// Bind the addresses from configuration
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        let ingest_addr = config.ingest.listen_addr().map_err(ServerError::Config)?;
        Ok(Self {
            ingest: bind("ingest", &ingest_addr.to_string()).await?,
            query: bind("query", &config.query.address).await?,
            health: bind("health", &config.health.address).await?,
        })
    }

    /// Local addresses, in (ingest, query, health) order
    pub fn local_addrs(&self) -> std::io::Result<(SocketAddr, SocketAddr, SocketAddr)> {
        Ok((
            self.ingest.local_addr()?,
            self.query.local_addr()?,
            self.health.local_addr()?,
        ))
    }
}

async fn bind(what: &'static str, address: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            what,
            address: address.to_string(),
            source,
        })
}

/// Resolves once the shutdown flag is raised or its sender is dropped
pub async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Fully wired service
pub struct ActivescaleServer {
    config: Config,
    ingest: Arc<IngestServer>,
    query: Arc<QueryService>,
}

impl ActivescaleServer {
    /// Connect the configured store and lookup, then wire everything
    pub async fn build(config: Config) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;
        let store = gauge::connect_store(&config.store).await?;
        let lookup = query::build_lookup(&config.lookup)?;
        Ok(Self::from_parts(config, store, lookup))
    }

    /// Wire pre-built collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn GaugeStore>,
        lookup: Arc<dyn InstanceLookup>,
    ) -> Self {
        let ingest = Arc::new(IngestServer::new(
            store.clone(),
            IdentityResolver::default(),
            IngestSettings {
                metric_name: config.ingest.metric_name.clone(),
                gauge_name: config.store.gauge_name.clone(),
            },
        ));
        let query = Arc::new(QueryService::new(
            store,
            lookup,
            config.store.gauge_name.clone(),
            config.query.timeout,
        ));
        Self {
            config,
            ingest,
            query,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ingest(&self) -> &Arc<IngestServer> {
        &self.ingest
    }

    pub fn query(&self) -> &Arc<QueryService> {
        &self.query
    }

    /// gRPC service whose open streams end when `shutdown` fires
    pub fn ingest_service(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> MetricsServiceServer<MetricsSink> {
        MetricsSink::new(self.ingest.clone())
            .with_shutdown(shutdown)
            .into_service()
    }

    pub fn query_router(&self) -> Router {
        api::query_router(AppState::new(self.query.clone()))
    }

    pub fn health_router(&self) -> Router {
        api::health_router(AppState::new(self.query.clone()))
    }

    /// Serve until `shutdown` fires or a listener fails
    pub async fn run(
        self,
        listeners: Listeners,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), ServerError> {
        let interval = self.config.ingest.summary_interval;
        let summaries = [
            spawn_summary_task(self.ingest.counters(), interval),
            spawn_summary_task(self.query.counters(), interval),
        ];

        if let Ok((ingest, query, health)) = listeners.local_addrs() {
            tracing::info!(
                ingest = %ingest,
                query = %query,
                health = %health,
                metric_name = %self.config.ingest.metric_name,
                gauge_name = %self.config.store.gauge_name,
                "Activescale listening"
            );
        }

        let grpc = tonic::transport::Server::builder()
            .add_service(self.ingest_service(shutdown.clone()))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listeners.ingest),
                shutdown_signal(shutdown.clone()),
            );
        let query = axum::serve(listeners.query, self.query_router())
            .with_graceful_shutdown(shutdown_signal(shutdown.clone()));
        let drain = shutdown.clone();
        let health = axum::serve(listeners.health, self.health_router())
            .with_graceful_shutdown(shutdown_signal(shutdown));

        let result = tokio::try_join!(
            async {
                // Streams are closed on shutdown; a peer that still holds its
                // connection open is dropped after the drain deadline.
                tokio::select! {
                    result = grpc => result.map_err(ServerError::from),
                    _ = async {
                        shutdown_signal(drain).await;
                        tokio::time::sleep(SHUTDOWN_DRAIN_TIMEOUT).await;
                    } => {
                        tracing::warn!(
                            timeout_ms = SHUTDOWN_DRAIN_TIMEOUT.as_millis() as u64,
                            "Telemetry connections still open after drain deadline, closing"
                        );
                        Ok(())
                    }
                }
            },
            async {
                query.await.map_err(|source| ServerError::Http {
                    what: "query",
                    source,
                })
            },
            async {
                health.await.map_err(|source| ServerError::Http {
                    what: "health",
                    source,
                })
            },
        );

        for task in summaries {
            task.abort();
        }
        result.map(|_| ())
    }
}
