// Structured metadata strategy

use std::collections::BTreeMap;

use super::{InstanceIdentity, NodeIdentifier, ResolveStrategy};

/// Instance-name keys, highest priority first
const INSTANCE_KEYS: &[&str] = &["POD_NAME", "pod_name", "NAME", "POD", "pod"];

/// Namespace keys, highest priority first
const NAMESPACE_KEYS: &[&str] = &[
    "POD_NAMESPACE",
    "pod_namespace",
    "NAMESPACE",
    "ns",
    "namespace",
];

/// Reads the identity from the node's metadata map
///
/// Each field has a list of aliases. Exact matches are tried first in alias
/// order; if none hits, ASCII case-insensitive matches are tried in the same
/// order. Empty values are skipped.
#[derive(Debug, Clone)]
pub struct MetadataStrategy {
    instance_keys: Vec<String>,
    namespace_keys: Vec<String>,
}

impl MetadataStrategy {
    pub fn new(instance_keys: Vec<String>, namespace_keys: Vec<String>) -> Self {
        Self {
            instance_keys,
            namespace_keys,
        }
    }

    fn lookup(metadata: &BTreeMap<String, String>, aliases: &[String]) -> String {
        for alias in aliases {
            if let Some(value) = metadata.get(alias) {
                if !value.is_empty() {
                    return value.clone();
                }
            }
        }
        // BTreeMap iteration is ordered, so the case-insensitive pass is
        // deterministic even if several keys differ only by case.
        for alias in aliases {
            let hit = metadata
                .iter()
                .find(|(k, v)| k.eq_ignore_ascii_case(alias) && !v.is_empty());
            if let Some((_, value)) = hit {
                return value.clone();
            }
        }
        String::new()
    }
}

impl Default for MetadataStrategy {
    fn default() -> Self {
        Self::new(
            INSTANCE_KEYS.iter().map(|k| k.to_string()).collect(),
            NAMESPACE_KEYS.iter().map(|k| k.to_string()).collect(),
        )
    }
}

impl ResolveStrategy for MetadataStrategy {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn resolve(&self, node: &NodeIdentifier) -> Option<InstanceIdentity> {
        let metadata = node.metadata.as_ref()?;
        InstanceIdentity::complete(
            Self::lookup(metadata, &self.namespace_keys),
            Self::lookup(metadata, &self.instance_keys),
        )
    }
}
