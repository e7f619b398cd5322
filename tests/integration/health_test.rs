// Health listener tests

use super::test_harness::*;

#[tokio::test]
async fn test_healthz() {
    let service = TestService::start().await;

    let response = reqwest::get(format!("{}/healthz", service.health_url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
    service.stop().await;
}

#[tokio::test]
async fn test_readyz_with_local_collaborators() {
    let service = TestService::start().await;

    let response = reqwest::get(format!("{}/readyz", service.health_url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "ready");
    service.stop().await;
}

#[tokio::test]
async fn test_metrics_exposes_ingest_counters() {
    let service = TestService::start().await;
    service
        .send(vec![batch(
            node("sidecar~10.0.0.1~pod-7.billing~billing.svc.cluster.local"),
            vec![gauge(TRACKED_METRIC, 1.0)],
        )])
        .await;

    let response = reqwest::get(format!("{}/metrics", service.health_url))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains("activescale_ingest_batches_total"));
    assert!(text.contains("activescale_ingest_records_total{outcome=\"accepted\"}"));
    service.stop().await;
}
