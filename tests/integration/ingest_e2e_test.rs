// End-to-end ingest tests over a real gRPC connection

use std::time::Duration;

use super::test_harness::*;

const NODE_ID: &str = "sidecar~10.0.0.1~pod-7.billing~billing.svc.cluster.local";

#[tokio::test]
async fn test_node_id_stream_writes_gauge() {
    let service = TestService::start().await;

    service
        .send(vec![batch(node(NODE_ID), vec![gauge(TRACKED_METRIC, 3.0)])])
        .await;

    assert_eq!(service.read("billing", "pod-7").await, Some(3.0));
    service.stop().await;
}

#[tokio::test]
async fn test_metadata_stream_writes_gauge() {
    let service = TestService::start().await;

    service
        .send(vec![batch(
            metadata_node(&[("POD_NAME", "pod-8"), ("POD_NAMESPACE", "billing")]),
            vec![gauge(TRACKED_METRIC, 5.0)],
        )])
        .await;

    assert_eq!(service.read("billing", "pod-8").await, Some(5.0));
    service.stop().await;
}

#[tokio::test]
async fn test_identity_from_first_message_covers_later_batches() {
    let service = TestService::start().await;

    service
        .send(vec![
            batch(node(NODE_ID), vec![gauge(TRACKED_METRIC, 1.0)]),
            batch(None, vec![gauge(TRACKED_METRIC, 2.0)]),
            batch(None, vec![gauge(TRACKED_METRIC, 7.0)]),
        ])
        .await;

    assert_eq!(service.read("billing", "pod-7").await, Some(7.0));
    service.stop().await;
}

#[tokio::test]
async fn test_unidentified_stream_stays_open_and_writes_nothing() {
    let service = TestService::start().await;

    // The stream completes normally even though nothing could be attributed
    service
        .send(vec![
            batch(None, vec![gauge(TRACKED_METRIC, 1.0)]),
            batch(node("router"), vec![gauge(TRACKED_METRIC, 2.0)]),
        ])
        .await;

    assert_eq!(service.store.entry_count(), 0);
    service.stop().await;
}

#[tokio::test]
async fn test_only_exact_gauge_of_tracked_metric_is_stored() {
    let service = TestService::start().await;

    service
        .send(vec![batch(
            node(NODE_ID),
            vec![
                gauge("cluster.inbound.http.stats.downstream_rq_active", 11.0),
                gauge("http.stats.downstream_rq_active.total", 12.0),
                counter(TRACKED_METRIC, 13.0),
            ],
        )])
        .await;

    assert_eq!(service.read("billing", "pod-7").await, None);
    service.stop().await;
}

#[tokio::test]
async fn test_concurrent_streams_for_different_instances() {
    let service = TestService::start().await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        let id = format!("sidecar~10.0.0.{i}~pod-{i}.billing~billing.svc.cluster.local");
        let mut client = service.client().await;
        tasks.push(tokio::spawn(async move {
            let messages = vec![batch(node(&id), vec![gauge(TRACKED_METRIC, i as f64)])];
            client
                .stream_metrics(tokio_stream::iter(messages))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..8 {
        assert_eq!(
            service.read("billing", &format!("pod-{i}")).await,
            Some(i as f64)
        );
    }
    service.stop().await;
}

#[tokio::test]
async fn test_concurrent_writes_to_same_key_keep_one_value() {
    let service = TestService::start().await;

    let mut tasks = Vec::new();
    for value in [4.0, 9.0] {
        let mut client = service.client().await;
        tasks.push(tokio::spawn(async move {
            let messages = vec![batch(node(NODE_ID), vec![gauge(TRACKED_METRIC, value)])];
            client
                .stream_metrics(tokio_stream::iter(messages))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let stored = service.read("billing", "pod-7").await.unwrap();
    assert!(stored == 4.0 || stored == 9.0, "unexpected value {stored}");
    service.stop().await;
}

#[tokio::test]
async fn test_written_gauge_expires_after_ttl() {
    let service = TestService::start_with_ttl(Duration::from_millis(200)).await;

    service
        .send(vec![batch(node(NODE_ID), vec![gauge(TRACKED_METRIC, 3.0)])])
        .await;
    assert_eq!(service.read("billing", "pod-7").await, Some(3.0));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(service.read("billing", "pod-7").await, None);
    service.stop().await;
}

#[tokio::test]
async fn test_stop_closes_open_streams() {
    let service = TestService::start().await;
    let mut client = service.client().await;

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    tx.send(batch(node(NODE_ID), vec![gauge(TRACKED_METRIC, 3.0)]))
        .await
        .unwrap();
    let call = tokio::spawn(async move {
        client
            .stream_metrics(tokio_stream::wrappers::ReceiverStream::new(rx))
            .await
    });

    let mut value = None;
    for _ in 0..100 {
        value = service.read("billing", "pod-7").await;
        if value.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(value, Some(3.0));

    // The proxy keeps its stream open; stopping must not wait on it
    service.stop().await;

    let outcome = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("client call ends after shutdown")
        .unwrap();
    assert!(outcome.is_err());
    drop(tx);
}
