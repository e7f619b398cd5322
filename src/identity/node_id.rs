// Tilde-delimited node id strategy

use super::{InstanceIdentity, NodeIdentifier, ResolveStrategy};

/// Minimum number of `~` separated fields: role, ip, name.namespace
const MIN_FIELDS: usize = 3;

/// Parses sidecar node ids of the form
/// `role~ip~name.namespace~namespace.svc.cluster.local`.
///
/// The third field is split at its last `.`: namespaces are DNS labels and
/// never contain dots, while instance names may.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeIdStrategy;

impl NodeIdStrategy {
    fn parse(id: &str) -> Option<InstanceIdentity> {
        let fields: Vec<&str> = id.split('~').collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }
        let (instance, namespace) = fields[2].rsplit_once('.')?;
        InstanceIdentity::complete(namespace.to_string(), instance.to_string())
    }
}

impl ResolveStrategy for NodeIdStrategy {
    fn name(&self) -> &'static str {
        "node_id"
    }

    fn resolve(&self, node: &NodeIdentifier) -> Option<InstanceIdentity> {
        if node.id.is_empty() {
            return None;
        }
        Self::parse(&node.id)
    }
}
