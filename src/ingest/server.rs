// Ingest receive loop
//
// One call of `consume` per proxy stream. Identity is resolved lazily and
// cached for the stream; until it resolves, every batch is dropped but the
// stream stays open. Writes for one stream are awaited in receive order.

use futures::{Stream, StreamExt};
use prometheus::IntGauge;
use std::sync::Arc;
use tonic::Status;

use super::counters::IngestCounters;
use super::proto::StreamMetricsMessage;
use crate::gauge::{GaugeKey, GaugeStore};
use crate::identity::{IdentityResolver, InstanceIdentity, NodeIdentifier};
use crate::metrics::ActivescaleMetrics;

/// Settings for the ingest path
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Upstream metric family to accept; compared by exact name
    pub metric_name: String,
    /// Name the accepted gauge is stored under
    pub gauge_name: String,
}

/// Holds one slot of the active stream gauge; released on drop, so a
/// cancelled `consume` is counted out as well
struct ActiveStream<'a>(&'a IntGauge);

impl<'a> ActiveStream<'a> {
    fn enter(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Writes the tracked gauge of every proxy stream into the store
pub struct IngestServer {
    store: Arc<dyn GaugeStore>,
    resolver: IdentityResolver,
    settings: IngestSettings,
    counters: Arc<IngestCounters>,
}

impl IngestServer {
    pub fn new(store: Arc<dyn GaugeStore>, resolver: IdentityResolver, settings: IngestSettings) -> Self {
        Self {
            store,
            resolver,
            settings,
            counters: Arc::new(IngestCounters::new()),
        }
    }

    /// Counters owned by this server, for the summary task
    pub fn counters(&self) -> Arc<IngestCounters> {
        self.counters.clone()
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Drive one stream until it ends.
    ///
    /// Returns `Ok(())` when the peer closes the stream and the receive error
    /// otherwise. Errors are not retried here.
    pub async fn consume<S>(&self, mut stream: S) -> Result<(), Status>
    where
        S: Stream<Item = Result<StreamMetricsMessage, Status>> + Unpin,
    {
        let _active = ActiveStream::enter(&ActivescaleMetrics::global().ingest_active_streams);

        let mut identity: Option<InstanceIdentity> = None;
        let result = loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(status)) => break Err(status),
                None => break Ok(()),
            };

            if identity.is_none() {
                identity = self.resolve(&message);
            }
            self.process_batch(identity.as_ref(), &message).await;
        };

        match (&result, &identity) {
            (Ok(()), Some(id)) => tracing::debug!(identity = %id, "Telemetry stream closed"),
            (Ok(()), None) => tracing::debug!("Unidentified telemetry stream closed"),
            (Err(status), _) => tracing::debug!(
                identity = identity.as_ref().map(|id| id.to_string()).unwrap_or_default(),
                code = ?status.code(),
                message = status.message(),
                "Telemetry stream ended with error"
            ),
        }
        result
    }

    fn resolve(&self, message: &StreamMetricsMessage) -> Option<InstanceIdentity> {
        let node = message.node()?;
        let resolved = self.resolver.resolve(&NodeIdentifier::from(node));
        match &resolved {
            Some(identity) => tracing::debug!(
                node_id = %node.id,
                identity = %identity,
                "Telemetry stream identified"
            ),
            None => tracing::debug!(node_id = %node.id, "Could not resolve stream identity"),
        }
        resolved
    }

    /// Apply one batch. Never fails: every problem is counted and logged.
    pub async fn process_batch(
        &self,
        identity: Option<&InstanceIdentity>,
        message: &StreamMetricsMessage,
    ) {
        let metrics = ActivescaleMetrics::global();
        self.counters.add_batch();
        metrics.ingest_batches.inc();

        let Some(identity) = identity else {
            let families = message.envoy_metrics.len() as u64;
            self.counters.add_dropped_identity(families);
            metrics.record_ingest("dropped_identity", families);
            return;
        };

        for family in &message.envoy_metrics {
            if family.name.as_deref() != Some(self.settings.metric_name.as_str()) {
                self.counters.add_dropped_name();
                metrics.record_ingest("dropped_name", 1);
                continue;
            }

            for sample in &family.metric {
                let Some(gauge) = &sample.gauge else {
                    self.counters.add_ignored_type();
                    metrics.record_ingest("ignored_type", 1);
                    continue;
                };
                let value = gauge.value.unwrap_or_default();
                // NaN and infinities have no quantity form; never store them
                if !value.is_finite() {
                    self.counters.add_ignored_type();
                    metrics.record_ingest("ignored_type", 1);
                    continue;
                }
                self.write(identity, value).await;
            }
        }
    }

    async fn write(&self, identity: &InstanceIdentity, value: f64) {
        let key = GaugeKey::new(
            identity.namespace.as_str(),
            identity.instance.as_str(),
            self.settings.gauge_name.as_str(),
        );
        match self.store.write(&key, value).await {
            Ok(()) => {
                self.counters.add_accepted();
                ActivescaleMetrics::global().record_ingest("accepted", 1);
                tracing::trace!(key = %key, value, "Gauge written");
            }
            Err(e) => {
                self.counters.add_write_error();
                ActivescaleMetrics::global().record_ingest("write_error", 1);
                tracing::warn!(key = %key, value, error = %e, "Failed to write gauge");
            }
        }
    }
}
