// gRPC binding for the ingest server

use std::sync::Arc;
use tokio::sync::watch;
use tonic::{Request, Response, Status, Streaming};

use super::proto::service::metrics_service_server::{MetricsService, MetricsServiceServer};
use super::proto::{StreamMetricsMessage, StreamMetricsResponse};
use super::server::IngestServer;
use crate::server::shutdown_signal;

/// Envoy `MetricsService` implementation backed by an `IngestServer`
#[derive(Clone)]
pub struct MetricsSink {
    server: Arc<IngestServer>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl MetricsSink {
    pub fn new(server: Arc<IngestServer>) -> Self {
        Self {
            server,
            shutdown: None,
        }
    }

    /// End open streams with `UNAVAILABLE` once the flag is raised.
    ///
    /// Proxy streams never end on their own, so without this a graceful
    /// shutdown waits on them forever.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Wrap into the tonic service type for `Server::add_service`
    pub fn into_service(self) -> MetricsServiceServer<Self> {
        MetricsServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl MetricsService for MetricsSink {
    async fn stream_metrics(
        &self,
        request: Request<Streaming<StreamMetricsMessage>>,
    ) -> Result<Response<StreamMetricsResponse>, Status> {
        let peer = request.remote_addr();
        tracing::debug!(peer = ?peer, "Telemetry stream opened");

        let stream = request.into_inner();
        match self.shutdown.clone() {
            Some(shutdown) => {
                tokio::select! {
                    result = self.server.consume(stream) => result?,
                    _ = shutdown_signal(shutdown) => {
                        tracing::debug!(peer = ?peer, "Closing telemetry stream for shutdown");
                        return Err(Status::unavailable("server is shutting down"));
                    }
                }
            }
            None => self.server.consume(stream).await?,
        }
        Ok(Response::new(StreamMetricsResponse {}))
    }
}
