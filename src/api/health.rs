// Liveness, readiness and metrics endpoints

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use super::AppState;
use crate::metrics::export_text;

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /readyz`: store ping and lookup readiness, both within the
/// readiness deadline
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let store = state.query.store().clone();
    let lookup = state.query.lookup().clone();

    let check = async move {
        store
            .ping()
            .await
            .map_err(|e| format!("store {}: {}", store.backend_name(), e))?;
        lookup
            .ready()
            .await
            .map_err(|e| format!("lookup {}: {}", lookup.backend_name(), e))
    };

    match tokio::time::timeout(state.readiness_timeout, check).await {
        Ok(Ok(())) => (StatusCode::OK, "ready"),
        Ok(Err(reason)) => {
            tracing::warn!(reason = %reason, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = state.readiness_timeout.as_millis() as u64,
                "Readiness check timed out"
            );
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}

/// `GET /metrics`
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        export_text(),
    )
}
