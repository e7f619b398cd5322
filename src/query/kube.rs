//! Kubernetes instance lookup
//!
//! Lists pods through the core v1 REST API with a plain HTTP client. Only the
//! pod names are read from the response; pods that are being deleted are
//! still returned, since their sidecars may keep reporting until they exit
//! and the store TTL covers the tail.

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde::Deserialize;
use std::path::Path;

use super::config::LookupConfig;
use super::lookup::{InstanceLookup, LookupError};
use super::selector::LabelSelector;

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

/// Pod lookup against the Kubernetes API server
#[derive(Debug, Clone)]
pub struct KubeInstanceLookup {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KubeInstanceLookup {
    /// Build a lookup from configuration.
    ///
    /// Without an explicit `api_server`, the in-cluster address is taken
    /// from `KUBERNETES_SERVICE_HOST` and `KUBERNETES_SERVICE_PORT`. Missing
    /// token or CA files are tolerated so the lookup can also point at an
    /// unauthenticated proxy such as `kubectl proxy`.
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let base_url = match &config.api_server {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => in_cluster_url()?,
        };

        let mut builder = Client::builder().timeout(config.timeout());
        if config.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(ca) = read_optional(&config.ca_file)? {
            let cert = Certificate::from_pem(&ca).map_err(|e| {
                LookupError::Configuration(format!(
                    "Invalid CA bundle {}: {}",
                    config.ca_file.display(),
                    e
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder.build().map_err(|e| {
            LookupError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        let token = read_optional(&config.token_file)?
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .filter(|t| !t.is_empty());

        tracing::info!(
            api_server = %base_url,
            authenticated = token.is_some(),
            "Kubernetes instance lookup configured"
        );

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pods_url(&self, namespace: &str, selector: &LabelSelector) -> String {
        let mut url = format!(
            "{}/api/v1/namespaces/{}/pods",
            self.base_url,
            urlencoding::encode(namespace)
        );
        if !selector.is_empty() {
            url.push_str("?labelSelector=");
            url.push_str(&urlencoding::encode(&selector.to_string()));
        }
        url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, LookupError> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Request("Request timed out".to_string())
            } else if e.is_connect() {
                LookupError::Request(format!("Connection failed: {}", e))
            } else {
                LookupError::Request(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LookupError::Status {
            status: status.as_u16(),
            message: status_message(status, &body),
        })
    }
}

#[async_trait]
impl InstanceLookup for KubeInstanceLookup {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<String>, LookupError> {
        let url = self.pods_url(namespace, selector);
        let pods: PodList = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        tracing::debug!(
            namespace,
            selector = %selector,
            pods = pods.items.len(),
            "Listed pods"
        );
        Ok(pods.items.into_iter().map(|p| p.metadata.name).collect())
    }

    async fn ready(&self) -> Result<(), LookupError> {
        self.get(&format!("{}/version", self.base_url)).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "kubernetes"
    }
}

fn in_cluster_url() -> Result<String, LookupError> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
        LookupError::Configuration(
            "lookup.api_server is not set and KUBERNETES_SERVICE_HOST is not defined".to_string(),
        )
    })?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
    // IPv6 service hosts need brackets
    if host.contains(':') {
        Ok(format!("https://[{}]:{}", host, port))
    } else {
        Ok(format!("https://{}:{}", host, port))
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, LookupError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LookupError::Configuration(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Prefer the `message` of a Kubernetes Status body when there is one
fn status_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct Status {
        message: Option<String>,
    }
    serde_json::from_str::<Status>(body)
        .ok()
        .and_then(|s| s.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string())
}
