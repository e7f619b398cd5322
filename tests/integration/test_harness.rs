// Test harness for integration tests
// Runs the full service in-process on ephemeral ports

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use activescale::config::Config;
use activescale::gauge::{GaugeStore, MemoryGaugeStore};
use activescale::ingest::proto::service::metrics_service_client::MetricsServiceClient;
use activescale::ingest::proto::{
    Counter, Gauge, Identifier, Metric, MetricFamily, Node, StreamMetricsMessage,
};
use activescale::query::StaticInstanceLookup;
use activescale::server::{ActivescaleServer, Listeners, ServerError};

pub const TRACKED_METRIC: &str = "http.stats.downstream_rq_active";
pub const GAUGE_NAME: &str = "active_requests";
pub const API_BASE: &str = "/apis/custom.metrics.k8s.io/v1beta2";

/// Running service plus handles to its collaborators
pub struct TestService {
    pub ingest_addr: SocketAddr,
    pub query_url: String,
    pub health_url: String,
    pub store: Arc<MemoryGaugeStore>,
    pub lookup: Arc<StaticInstanceLookup>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestService {
    pub async fn start() -> Self {
        Self::start_with_ttl(Duration::from_secs(20)).await
    }

    pub async fn start_with_ttl(ttl: Duration) -> Self {
        let mut config = Config::default();
        config.store.ttl = ttl;
        config.ingest.address = "127.0.0.1".to_string();
        config.ingest.grpc_port = 0;
        config.query.address = "127.0.0.1:0".to_string();
        config.health.address = "127.0.0.1:0".to_string();

        let store = Arc::new(MemoryGaugeStore::new("it", ttl));
        let lookup = Arc::new(StaticInstanceLookup::new());
        let listeners = Listeners::bind(&config).await.expect("bind listeners");
        let (ingest_addr, query_addr, health_addr) = listeners.local_addrs().unwrap();

        let server = ActivescaleServer::from_parts(config, store.clone(), lookup.clone());
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(server.run(listeners, rx));

        Self {
            ingest_addr,
            query_url: format!("http://{}{}", query_addr, API_BASE),
            health_url: format!("http://{}", health_addr),
            store,
            lookup,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn register(&self, namespace: &str, name: &str, labels: &[(&str, &str)]) {
        let labels: BTreeMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.lookup.register(namespace, name, labels);
    }

    pub async fn client(&self) -> MetricsServiceClient<tonic::transport::Channel> {
        let endpoint = format!("http://{}", self.ingest_addr);
        // The listener is bound before the server task starts polling, but
        // give the server a moment in case the first connect races it.
        for _ in 0..50 {
            if let Ok(client) = MetricsServiceClient::connect(endpoint.clone()).await {
                return client;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("ingest server did not accept connections on {}", endpoint);
    }

    /// Send one complete stream and wait for the server to finish it
    pub async fn send(&self, messages: Vec<StreamMetricsMessage>) {
        let mut client = self.client().await;
        client
            .stream_metrics(tokio_stream::iter(messages))
            .await
            .expect("stream accepted");
    }

    pub async fn read(&self, namespace: &str, instance: &str) -> Option<f64> {
        self.store
            .read(&activescale::gauge::GaugeKey::new(namespace, instance, GAUGE_NAME))
            .await
            .unwrap()
    }

    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server stops within deadline")
                .expect("server task did not panic")
                .expect("server exits cleanly");
        }
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

pub fn node(id: &str) -> Option<Identifier> {
    Some(Identifier {
        node: Some(Node {
            id: id.to_string(),
            ..Default::default()
        }),
    })
}

pub fn metadata_node(entries: &[(&str, &str)]) -> Option<Identifier> {
    let fields = entries
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                prost_types::Value {
                    kind: Some(prost_types::value::Kind::StringValue(v.to_string())),
                },
            )
        })
        .collect();
    Some(Identifier {
        node: Some(Node {
            id: String::new(),
            cluster: "web".to_string(),
            metadata: Some(prost_types::Struct { fields }),
        }),
    })
}

pub fn gauge(name: &str, value: f64) -> MetricFamily {
    MetricFamily {
        name: Some(name.to_string()),
        metric: vec![Metric {
            gauge: Some(Gauge { value: Some(value) }),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn counter(name: &str, value: f64) -> MetricFamily {
    MetricFamily {
        name: Some(name.to_string()),
        metric: vec![Metric {
            counter: Some(Counter { value: Some(value) }),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn batch(identifier: Option<Identifier>, families: Vec<MetricFamily>) -> StreamMetricsMessage {
    StreamMetricsMessage {
        identifier,
        envoy_metrics: families,
    }
}
