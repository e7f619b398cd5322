//! Custom metrics API handlers
//!
//! Serves the subset of `custom.metrics.k8s.io/v1beta2` that autoscalers use
//! for pod metrics: discovery, selector queries (`pods/*`) and single pod
//! queries. Failures are Kubernetes `Status` bodies so that clients report
//! them verbatim.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::constants::CUSTOM_METRICS_GROUP_VERSION;
use crate::query::{LabelSelector, MetricValue, QueryError, SelectorError};

/// Path segment that turns a pod query into a selector query
const ALL_PODS: &str = "*";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub kind: String,
    pub api_version: String,
    pub group_version: String,
    pub resources: Vec<ApiResource>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    pub singular_name: String,
    pub namespaced: bool,
    pub kind: String,
    pub verbs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueList {
    pub kind: String,
    pub api_version: String,
    pub metadata: ListMeta,
    pub items: Vec<MetricValueItem>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ListMeta {}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueItem {
    pub described_object: ObjectReference,
    pub metric: MetricIdentifier,
    pub timestamp: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricIdentifier {
    pub name: String,
}

/// Kubernetes `Status` failure body
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub kind: String,
    pub api_version: String,
    pub metadata: ListMeta,
    pub status: String,
    pub message: String,
    pub reason: String,
    pub code: u16,
}

/// Handler error rendered as a `Status` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub reason: &'static str,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            reason: "BadRequest",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiStatus {
            kind: "Status".to_string(),
            api_version: "v1".to_string(),
            metadata: ListMeta::default(),
            status: "Failure".to_string(),
            message: self.message,
            reason: self.reason.to_string(),
            code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let (status, reason) = match &err {
            QueryError::NamespaceRequired | QueryError::InvalidName(_) => {
                (StatusCode::BAD_REQUEST, "BadRequest")
            }
            QueryError::MetricNotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            QueryError::NoDataForSelector | QueryError::NoDataForInstance => {
                (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable")
            }
            QueryError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Timeout"),
            QueryError::Lookup(_) | QueryError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        };
        Self {
            status,
            reason,
            message: err.to_string(),
        }
    }
}

impl From<SelectorError> for ApiError {
    fn from(err: SelectorError) -> Self {
        Self::bad_request(format!("invalid label selector: {}", err))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodQuery {
    #[serde(default)]
    pub label_selector: Option<String>,
    /// Accepted for compatibility; gauges carry no labels to select on
    #[serde(default)]
    pub metric_label_selector: Option<String>,
}

/// Render a gauge as a Kubernetes quantity: integers verbatim, anything
/// else in milli-units
pub fn format_quantity(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let milli = (value * 1000.0).round() as i64;
    if milli % 1000 == 0 {
        format!("{}", milli / 1000)
    } else {
        format!("{}m", milli)
    }
}

fn item(value: MetricValue) -> MetricValueItem {
    MetricValueItem {
        described_object: ObjectReference {
            kind: "Pod".to_string(),
            namespace: value.namespace,
            name: value.instance,
            api_version: "/v1".to_string(),
        },
        metric: MetricIdentifier { name: value.metric },
        timestamp: value
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        value: format_quantity(value.value),
    }
}

fn value_list(items: Vec<MetricValue>) -> MetricValueList {
    MetricValueList {
        kind: "MetricValueList".to_string(),
        api_version: CUSTOM_METRICS_GROUP_VERSION.to_string(),
        metadata: ListMeta::default(),
        items: items.into_iter().map(item).collect(),
    }
}

/// `GET /apis/custom.metrics.k8s.io/v1beta2`
pub async fn discovery(State(state): State<AppState>) -> Json<ApiResourceList> {
    let resources = state
        .query
        .list_metrics()
        .into_iter()
        .map(|info| ApiResource {
            name: format!("{}/{}", info.resource, info.metric),
            singular_name: String::new(),
            namespaced: info.namespaced,
            kind: "MetricValueList".to_string(),
            verbs: vec!["get".to_string()],
        })
        .collect();

    Json(ApiResourceList {
        kind: "APIResourceList".to_string(),
        api_version: "v1".to_string(),
        group_version: CUSTOM_METRICS_GROUP_VERSION.to_string(),
        resources,
    })
}

/// `GET .../namespaces/{namespace}/pods/{name}/{metric}`
///
/// `name == "*"` selects pods by `labelSelector`.
pub async fn namespaced_pod_metric(
    State(state): State<AppState>,
    Path((namespace, name, metric)): Path<(String, String, String)>,
    Query(query): Query<PodQuery>,
) -> Result<Json<MetricValueList>, ApiError> {
    if name == ALL_PODS {
        let selector = LabelSelector::parse(query.label_selector.as_deref().unwrap_or_default())?;
        let items = state
            .query
            .by_selector(&namespace, &selector, &metric)
            .await?;
        return Ok(Json(value_list(items)));
    }

    let value = state.query.by_name(&namespace, &name, &metric).await?;
    Ok(Json(value_list(vec![value])))
}

/// `GET .../pods/{name}/{metric}` without a namespace
///
/// Pods are namespaced, so this always fails; the name path still goes
/// through the query service so the failure is counted.
pub async fn cluster_pod_metric(
    State(state): State<AppState>,
    Path((name, metric)): Path<(String, String)>,
) -> Result<Json<MetricValueList>, ApiError> {
    if name == ALL_PODS {
        return Err(QueryError::NamespaceRequired.into());
    }
    let value = state.query.by_name("", &name, &metric).await?;
    Ok(Json(value_list(vec![value])))
}
