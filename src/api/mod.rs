//! HTTP surfaces
//!
//! Two routers share one state:
//!
//! - `query_router`: the custom metrics API consumed by autoscalers
//! - `health_router`: `/healthz`, `/readyz` and `/metrics` for probes and
//!   scrapers, served on a separate listener

pub mod custom_metrics;
pub mod health;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{CUSTOM_METRICS_GROUP_VERSION, READINESS_TIMEOUT};
use crate::query::QueryService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryService>,
    pub readiness_timeout: Duration,
}

impl AppState {
    pub fn new(query: Arc<QueryService>) -> Self {
        Self {
            query,
            readiness_timeout: READINESS_TIMEOUT,
        }
    }
}

/// Router for the custom metrics API group
pub fn query_router(state: AppState) -> Router {
    let base = format!("/apis/{}", CUSTOM_METRICS_GROUP_VERSION);
    Router::new()
        .route(&base, get(custom_metrics::discovery))
        .route(
            &format!("{}/namespaces/{{namespace}}/pods/{{name}}/{{metric}}", base),
            get(custom_metrics::namespaced_pod_metric),
        )
        .route(
            &format!("{}/pods/{{name}}/{{metric}}", base),
            get(custom_metrics::cluster_pod_metric),
        )
        .with_state(state)
}

/// Router for probes and metrics
pub fn health_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .with_state(state)
}
