// Custom metrics API tests: ingest over gRPC, query over HTTP

use serde_json::Value;
use std::time::Duration;

use super::test_harness::*;

async fn get(url: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn node_id(pod: &str) -> String {
    format!("sidecar~10.0.0.1~{pod}.billing~billing.svc.cluster.local")
}

#[tokio::test]
async fn test_discovery_lists_gauge() {
    let service = TestService::start().await;

    let (status, body) = get(&service.query_url).await;
    assert_eq!(status, 200);
    assert_eq!(body["kind"], "APIResourceList");
    assert_eq!(body["groupVersion"], "custom.metrics.k8s.io/v1beta2");
    assert_eq!(body["resources"][0]["name"], "pods/active_requests");
    assert_eq!(body["resources"][0]["namespaced"], true);
    service.stop().await;
}

#[tokio::test]
async fn test_selector_query_returns_only_fresh_instances() {
    let service = TestService::start().await;
    service.register("billing", "pod-7", &[("app", "web")]);
    service.register("billing", "pod-8", &[("app", "web")]);
    service.register("billing", "pod-9", &[("app", "worker")]);

    service
        .send(vec![batch(node(&node_id("pod-7")), vec![gauge(TRACKED_METRIC, 3.0)])])
        .await;
    service
        .send(vec![batch(node(&node_id("pod-9")), vec![gauge(TRACKED_METRIC, 8.0)])])
        .await;

    let (status, body) = get(&format!(
        "{}/namespaces/billing/pods/*/active_requests?labelSelector=app%3Dweb",
        service.query_url
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["kind"], "MetricValueList");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["describedObject"]["name"], "pod-7");
    assert_eq!(items[0]["describedObject"]["kind"], "Pod");
    assert_eq!(items[0]["metric"]["name"], "active_requests");
    assert_eq!(items[0]["value"], "3");
    service.stop().await;
}

#[tokio::test]
async fn test_selector_query_with_no_data_is_unavailable() {
    let service = TestService::start().await;
    service.register("billing", "pod-7", &[("app", "web")]);

    let (status, body) = get(&format!(
        "{}/namespaces/billing/pods/*/active_requests?labelSelector=app%3Dweb",
        service.query_url
    ))
    .await;
    assert_eq!(status, 503);
    assert_eq!(body["kind"], "Status");
    assert_eq!(body["status"], "Failure");
    assert_eq!(body["code"], 503);
    service.stop().await;
}

#[tokio::test]
async fn test_name_query() {
    let service = TestService::start().await;
    service
        .send(vec![batch(node(&node_id("pod-7")), vec![gauge(TRACKED_METRIC, 2.5)])])
        .await;

    let (status, body) = get(&format!(
        "{}/namespaces/billing/pods/pod-7/active_requests",
        service.query_url
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["items"][0]["describedObject"]["namespace"], "billing");
    assert_eq!(body["items"][0]["value"], "2500m");
    service.stop().await;
}

#[tokio::test]
async fn test_name_query_after_expiry_is_unavailable() {
    let service = TestService::start_with_ttl(Duration::from_millis(200)).await;
    service
        .send(vec![batch(node(&node_id("pod-7")), vec![gauge(TRACKED_METRIC, 3.0)])])
        .await;
    let url = format!(
        "{}/namespaces/billing/pods/pod-7/active_requests",
        service.query_url
    );

    assert_eq!(get(&url).await.0, 200);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let (status, body) = get(&url).await;
    assert_eq!(status, 503);
    assert_eq!(body["message"], "no metrics available for pod");
    service.stop().await;
}

#[tokio::test]
async fn test_cluster_scoped_query_requires_namespace() {
    let service = TestService::start().await;

    let (status, body) = get(&format!("{}/pods/pod-7/active_requests", service.query_url)).await;
    assert_eq!(status, 400);
    assert_eq!(body["reason"], "BadRequest");
    service.stop().await;
}

#[tokio::test]
async fn test_unknown_metric_is_not_found() {
    let service = TestService::start().await;

    let (status, _) = get(&format!(
        "{}/namespaces/billing/pods/pod-7/requests_per_second",
        service.query_url
    ))
    .await;
    assert_eq!(status, 404);
    service.stop().await;
}

#[tokio::test]
async fn test_bad_selector_is_rejected() {
    let service = TestService::start().await;

    let (status, body) = get(&format!(
        "{}/namespaces/billing/pods/*/active_requests?labelSelector=app%20in%20(web",
        service.query_url
    ))
    .await;
    assert_eq!(status, 400);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid label selector"));
    service.stop().await;
}
