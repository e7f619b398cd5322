//! Instance identity resolution
//!
//! Recovers `(namespace, instance)` from the node identifier a proxy sends
//! when it opens a telemetry stream. Proxies in the fleet have used several
//! encodings over time, so resolution is an ordered list of strategies:
//!
//! 1. `MetadataStrategy` reads the structured metadata map, accepting several
//!    historical key aliases.
//! 2. `NodeIdStrategy` parses the tilde-delimited node id
//!    (`sidecar~10.0.0.1~pod-7.billing~billing.svc.cluster.local`).
//!
//! The first strategy that yields both fields wins; fields are never mixed
//! across strategies. Every strategy is a pure function of its input, so a
//! resolved identity can be cached for the lifetime of a connection.

mod metadata;
mod node_id;

use std::collections::BTreeMap;
use std::fmt;

pub use metadata::MetadataStrategy;
pub use node_id::NodeIdStrategy;

/// Connection-level identifier as sent by a proxy
///
/// `metadata` is `None` when the proxy sent no structured metadata at all,
/// which is different from sending an empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIdentifier {
    pub id: String,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl NodeIdentifier {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
        }
    }

    pub fn from_metadata<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: String::new(),
            metadata: Some(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// Resolved identity of one monitored instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentity {
    pub namespace: String,
    pub instance: String,
}

impl InstanceIdentity {
    pub fn new(namespace: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            instance: instance.into(),
        }
    }

    /// Both fields present; anything less counts as unresolved
    fn complete(namespace: String, instance: String) -> Option<Self> {
        if namespace.is_empty() || instance.is_empty() {
            None
        } else {
            Some(Self {
                namespace,
                instance,
            })
        }
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.instance)
    }
}

/// One way of reading an identity out of a node identifier
pub trait ResolveStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Returns `None` when this encoding is absent or incomplete
    fn resolve(&self, node: &NodeIdentifier) -> Option<InstanceIdentity>;
}

/// Ordered set of strategies tried in fixed priority
pub struct IdentityResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl IdentityResolver {
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        Self { strategies }
    }

    /// Resolve an identity, or `None` if no strategy succeeds
    pub fn resolve(&self, node: &NodeIdentifier) -> Option<InstanceIdentity> {
        for strategy in &self.strategies {
            if let Some(identity) = strategy.resolve(node) {
                tracing::trace!(
                    strategy = strategy.name(),
                    namespace = %identity.namespace,
                    instance = %identity.instance,
                    "Resolved instance identity"
                );
                return Some(identity);
            }
        }
        None
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for IdentityResolver {
    /// Metadata map first, delimited node id second
    fn default() -> Self {
        Self::new(vec![
            Box::new(MetadataStrategy::default()),
            Box::new(NodeIdStrategy),
        ])
    }
}
