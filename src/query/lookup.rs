// Instance lookup - enumerates candidate instances for selector queries

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

use super::config::StaticInstanceConfig;
use super::selector::LabelSelector;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup configuration error: {0}")]
    Configuration(String),

    #[error("lookup request failed: {0}")]
    Request(String),

    #[error("lookup rejected with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode lookup response: {0}")]
    Decode(String),
}

/// Source of instance names for a namespace and selector
#[async_trait]
pub trait InstanceLookup: Send + Sync {
    /// Names of the instances in `namespace` matching `selector`
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<String>, LookupError>;

    /// Check that the lookup can answer queries
    async fn ready(&self) -> Result<(), LookupError> {
        Ok(())
    }

    /// Short name for logs
    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct StaticInstance {
    name: String,
    labels: BTreeMap<String, String>,
}

/// In-memory instance registry
///
/// Instances are kept per namespace in registration order; registering an
/// existing name replaces its labels.
#[derive(Debug, Default)]
pub struct StaticInstanceLookup {
    namespaces: RwLock<BTreeMap<String, Vec<StaticInstance>>>,
}

impl StaticInstanceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(instances: &[StaticInstanceConfig]) -> Self {
        let lookup = Self::new();
        for instance in instances {
            lookup.register(&instance.namespace, &instance.name, instance.labels.clone());
        }
        lookup
    }

    pub fn register(&self, namespace: &str, name: &str, labels: BTreeMap<String, String>) {
        let mut namespaces = self.namespaces.write();
        let instances = namespaces.entry(namespace.to_string()).or_default();
        match instances.iter_mut().find(|i| i.name == name) {
            Some(existing) => existing.labels = labels,
            None => instances.push(StaticInstance {
                name: name.to_string(),
                labels,
            }),
        }
    }

    /// Returns true if the instance was registered
    pub fn remove(&self, namespace: &str, name: &str) -> bool {
        let mut namespaces = self.namespaces.write();
        let Some(instances) = namespaces.get_mut(namespace) else {
            return false;
        };
        let before = instances.len();
        instances.retain(|i| i.name != name);
        before != instances.len()
    }

    pub fn len(&self) -> usize {
        self.namespaces.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InstanceLookup for StaticInstanceLookup {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<String>, LookupError> {
        let namespaces = self.namespaces.read();
        Ok(namespaces
            .get(namespace)
            .map(|instances| {
                instances
                    .iter()
                    .filter(|i| selector.matches(&i.labels))
                    .map(|i| i.name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}
