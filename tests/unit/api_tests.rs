// Router tests without sockets

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use activescale::api::{health_router, query_router, AppState};
use activescale::gauge::{GaugeKey, GaugeStore, MemoryGaugeStore, StoreError};
use activescale::query::{
    InstanceLookup, LabelSelector, LookupError, QueryService, StaticInstanceLookup,
};

const BASE: &str = "/apis/custom.metrics.k8s.io/v1beta2";

async fn state_with(values: &[(&str, &str, f64)]) -> AppState {
    let store = Arc::new(MemoryGaugeStore::new("api", Duration::from_secs(20)));
    let lookup = StaticInstanceLookup::new();
    for (ns, name, value) in values {
        lookup.register(ns, name, BTreeMap::new());
        store
            .write(&GaugeKey::new(*ns, *name, "active_requests"), *value)
            .await
            .unwrap();
    }
    AppState::new(Arc::new(QueryService::new(
        store,
        Arc::new(lookup),
        "active_requests",
        Duration::from_secs(5),
    )))
}

async fn call(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

async fn call_text(router: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_selector_query_lists_all_fresh_pods() {
    let state = state_with(&[("billing", "pod-7", 3.0), ("billing", "pod-8", 0.0)]).await;

    let (status, body) = call(
        query_router(state),
        &format!("{BASE}/namespaces/billing/pods/*/active_requests"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["value"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["3", "0"]);
}

#[tokio::test]
async fn test_selector_query_in_empty_namespace_fails() {
    let state = state_with(&[("billing", "pod-7", 3.0)]).await;

    let (status, body) = call(
        query_router(state),
        &format!("{BASE}/namespaces/search/pods/*/active_requests"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "ServiceUnavailable");
    assert_eq!(body["message"], "no metrics available for selector");
}

#[tokio::test]
async fn test_malformed_pod_name_is_bad_request() {
    let state = state_with(&[("billing", "pod-7", 3.0)]).await;

    let (status, body) = call(
        query_router(state),
        &format!("{BASE}/namespaces/billing/pods/a:b/active_requests"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "BadRequest");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_timestamp_is_rfc3339() {
    let state = state_with(&[("billing", "pod-7", 3.0)]).await;

    let (_, body) = call(
        query_router(state),
        &format!("{BASE}/namespaces/billing/pods/pod-7/active_requests"),
    )
    .await;
    let timestamp = body["items"][0]["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_healthz_and_metrics() {
    let state = state_with(&[]).await;

    let (status, text) = call_text(health_router(state.clone()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ok");

    let (status, text) = call_text(health_router(state), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("activescale_"));
}

struct DownStore;

#[async_trait::async_trait]
impl GaugeStore for DownStore {
    async fn write(&self, _: &GaugeKey, _: f64) -> Result<(), StoreError> {
        Err(StoreError::ConnectionFailed("refused".to_string()))
    }

    async fn read(&self, _: &GaugeKey) -> Result<Option<f64>, StoreError> {
        Err(StoreError::ConnectionFailed("refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::ConnectionFailed("refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

struct SlowLookup;

#[async_trait::async_trait]
impl InstanceLookup for SlowLookup {
    async fn list(&self, _: &str, _: &LabelSelector) -> Result<Vec<String>, LookupError> {
        Ok(Vec::new())
    }

    async fn ready(&self) -> Result<(), LookupError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error_and_not_ready() {
    let state = AppState::new(Arc::new(QueryService::new(
        Arc::new(DownStore),
        Arc::new(StaticInstanceLookup::new()),
        "active_requests",
        Duration::from_secs(5),
    )));

    let (status, body) = call(
        query_router(state.clone()),
        &format!("{BASE}/namespaces/billing/pods/pod-7/active_requests"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);

    let (status, text) = call_text(health_router(state), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text, "not ready");
}

#[tokio::test]
async fn test_readiness_deadline() {
    let mut state = AppState::new(Arc::new(QueryService::new(
        Arc::new(MemoryGaugeStore::new("api", Duration::from_secs(20))),
        Arc::new(SlowLookup),
        "active_requests",
        Duration::from_secs(5),
    )));
    state.readiness_timeout = Duration::from_millis(50);

    let (status, text) = call_text(health_router(state), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text, "not ready");
}
