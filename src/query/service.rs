// Query service - answers selector and name queries from the gauge store
//
// Both shapes fail instead of returning an empty success: an empty list is
// indistinguishable from "every instance reports zero" to the consumer.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::lookup::{InstanceLookup, LookupError};
use super::selector::LabelSelector;
use crate::gauge::key::validate_component;
use crate::gauge::{GaugeKey, GaugeStore, StoreError};
use crate::metrics::ActivescaleMetrics;
use crate::summary::Summarize;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("namespace is required for pod metrics")]
    NamespaceRequired,

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("metric {0} not found")]
    MetricNotFound(String),

    #[error("no metrics available for selector")]
    NoDataForSelector,

    #[error("no metrics available for pod")]
    NoDataForInstance,

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Short label for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            QueryError::NamespaceRequired | QueryError::InvalidName(_) => "bad_request",
            QueryError::MetricNotFound(_) => "not_found",
            QueryError::NoDataForSelector | QueryError::NoDataForInstance => "no_data",
            QueryError::Timeout(_) => "timeout",
            QueryError::Lookup(_) => "lookup_error",
            QueryError::Store(_) => "store_error",
        }
    }
}

/// One returned gauge value
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub namespace: String,
    pub instance: String,
    pub metric: String,
    pub value: f64,
    /// Wall-clock time of the query, not of the write
    pub timestamp: DateTime<Utc>,
}

/// Declared metric for discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricInfo {
    pub resource: &'static str,
    pub metric: String,
    pub namespaced: bool,
}

/// Rolling query counters
#[derive(Debug, Default)]
pub struct QueryCounters {
    queries: AtomicU64,
    items: AtomicU64,
}

impl QueryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn add_items(&self, n: u64) {
        self.items.fetch_add(n, Ordering::Relaxed);
    }

    /// (queries, items) without resetting
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.queries.load(Ordering::Relaxed),
            self.items.load(Ordering::Relaxed),
        )
    }

    pub fn take(&self) -> (u64, u64) {
        (
            self.queries.swap(0, Ordering::Relaxed),
            self.items.swap(0, Ordering::Relaxed),
        )
    }
}

impl Summarize for QueryCounters {
    fn log_and_reset(&self, interval: Duration) {
        let (queries, items) = self.take();
        tracing::info!(
            interval_secs = interval.as_secs_f64(),
            queries,
            items,
            "Query summary"
        );
    }
}

/// Read-only query entry points over a gauge store and an instance lookup
pub struct QueryService {
    store: Arc<dyn GaugeStore>,
    lookup: Arc<dyn InstanceLookup>,
    gauge_name: String,
    timeout: Duration,
    counters: Arc<QueryCounters>,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn GaugeStore>,
        lookup: Arc<dyn InstanceLookup>,
        gauge_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            lookup,
            gauge_name: gauge_name.into(),
            timeout,
            counters: Arc::new(QueryCounters::new()),
        }
    }

    pub fn counters(&self) -> Arc<QueryCounters> {
        self.counters.clone()
    }

    pub fn gauge_name(&self) -> &str {
        &self.gauge_name
    }

    pub fn store(&self) -> &Arc<dyn GaugeStore> {
        &self.store
    }

    pub fn lookup(&self) -> &Arc<dyn InstanceLookup> {
        &self.lookup
    }

    /// Metrics this service can answer for
    pub fn list_metrics(&self) -> Vec<MetricInfo> {
        vec![MetricInfo {
            resource: "pods",
            metric: self.gauge_name.clone(),
            namespaced: true,
        }]
    }

    /// Values for every instance in `namespace` matching `selector`,
    /// with the default deadline
    pub async fn by_selector(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        metric: &str,
    ) -> Result<Vec<MetricValue>, QueryError> {
        self.by_selector_within(namespace, selector, metric, self.timeout)
            .await
    }

    /// Value for one named instance, with the default deadline
    pub async fn by_name(
        &self,
        namespace: &str,
        instance: &str,
        metric: &str,
    ) -> Result<MetricValue, QueryError> {
        self.by_name_within(namespace, instance, metric, self.timeout)
            .await
    }

    /// Selector query that fails as a whole once `deadline` passes
    pub async fn by_selector_within(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        metric: &str,
        deadline: Duration,
    ) -> Result<Vec<MetricValue>, QueryError> {
        self.counters.add_query();
        if !namespace.is_empty() {
            if let Err(reason) = validate_component("namespace", namespace) {
                return self.finish("selector", Err(QueryError::InvalidName(reason)), Vec::len);
            }
        }
        let result = match tokio::time::timeout(
            deadline,
            self.select(namespace, selector, metric),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(deadline)),
        };
        self.finish("selector", result, Vec::len)
    }

    /// Name query that fails once `deadline` passes
    pub async fn by_name_within(
        &self,
        namespace: &str,
        instance: &str,
        metric: &str,
        deadline: Duration,
    ) -> Result<MetricValue, QueryError> {
        // Checked before anything else so a malformed request never reaches
        // the store
        if namespace.is_empty() {
            self.counters.add_query();
            return self.finish("name", Err(QueryError::NamespaceRequired), |_| 1);
        }
        if let Err(reason) = validate_component("namespace", namespace)
            .and_then(|()| validate_component("instance", instance))
        {
            self.counters.add_query();
            return self.finish("name", Err(QueryError::InvalidName(reason)), |_| 1);
        }

        self.counters.add_query();
        let result = match tokio::time::timeout(deadline, self.named(namespace, instance, metric))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(deadline)),
        };
        self.finish("name", result, |_| 1)
    }

    async fn select(
        &self,
        namespace: &str,
        selector: &LabelSelector,
        metric: &str,
    ) -> Result<Vec<MetricValue>, QueryError> {
        self.check_metric(metric)?;
        tracing::debug!(namespace, metric, selector = %selector, "Custom metrics query");

        let instances = self.lookup.list(namespace, selector).await?;
        let now = Utc::now();
        let mut items = Vec::with_capacity(instances.len());
        for instance in instances {
            let key = GaugeKey::new(namespace, instance.as_str(), self.gauge_name.as_str());
            // Absent, expired and non-finite are skipped; errors abort the whole query
            if let Some(value) = self.store.read(&key).await?.filter(|v| v.is_finite()) {
                items.push(MetricValue {
                    namespace: namespace.to_string(),
                    instance,
                    metric: metric.to_string(),
                    value,
                    timestamp: now,
                });
            }
        }

        if items.is_empty() {
            tracing::debug!(namespace, metric, selector = %selector, "Custom metrics result empty");
            return Err(QueryError::NoDataForSelector);
        }
        tracing::debug!(
            namespace,
            metric,
            selector = %selector,
            count = items.len(),
            "Custom metrics result"
        );
        Ok(items)
    }

    async fn named(
        &self,
        namespace: &str,
        instance: &str,
        metric: &str,
    ) -> Result<MetricValue, QueryError> {
        self.check_metric(metric)?;
        tracing::debug!(namespace, instance, metric, "Custom metrics query");

        let key = GaugeKey::new(namespace, instance, self.gauge_name.as_str());
        match self.store.read(&key).await?.filter(|v| v.is_finite()) {
            Some(value) => Ok(MetricValue {
                namespace: namespace.to_string(),
                instance: instance.to_string(),
                metric: metric.to_string(),
                value,
                timestamp: Utc::now(),
            }),
            None => {
                tracing::debug!(namespace, instance, metric, "Custom metrics result empty");
                Err(QueryError::NoDataForInstance)
            }
        }
    }

    fn check_metric(&self, metric: &str) -> Result<(), QueryError> {
        if metric == self.gauge_name {
            Ok(())
        } else {
            Err(QueryError::MetricNotFound(metric.to_string()))
        }
    }

    fn finish<T>(
        &self,
        kind: &str,
        result: Result<T, QueryError>,
        count: impl Fn(&T) -> usize,
    ) -> Result<T, QueryError> {
        let metrics = ActivescaleMetrics::global();
        match &result {
            Ok(value) => {
                let n = count(value) as u64;
                self.counters.add_items(n);
                metrics.query_items.inc_by(n);
                metrics.record_query(kind, "ok");
            }
            Err(e) => {
                metrics.record_query(kind, e.outcome());
                match e {
                    QueryError::Lookup(_) | QueryError::Store(_) | QueryError::Timeout(_) => {
                        tracing::warn!(kind, error = %e, "Custom metrics query failed")
                    }
                    _ => {}
                }
            }
        }
        result
    }
}
