//! Query path
//!
//! Turns selector and name queries into lists of fresh gauge values. The
//! candidate set for selector queries comes from an `InstanceLookup`
//! (Kubernetes API or a static registry); values come from the shared
//! `GaugeStore`.

pub mod config;
pub mod kube;
pub mod lookup;
pub mod selector;
pub mod service;

use std::sync::Arc;

pub use config::{LookupBackend, LookupConfig, QueryConfig, StaticInstanceConfig};
pub use kube::KubeInstanceLookup;
pub use lookup::{InstanceLookup, LookupError, StaticInstanceLookup};
pub use selector::{LabelSelector, Operator, Requirement, SelectorError};
pub use service::{MetricInfo, MetricValue, QueryCounters, QueryError, QueryService};

/// Build the configured instance lookup
pub fn build_lookup(config: &LookupConfig) -> Result<Arc<dyn InstanceLookup>, LookupError> {
    match config.backend {
        LookupBackend::Kubernetes => Ok(Arc::new(KubeInstanceLookup::new(config)?)),
        LookupBackend::Static => {
            let lookup = StaticInstanceLookup::from_config(&config.instances);
            tracing::info!(instances = lookup.len(), "Static instance lookup configured");
            Ok(Arc::new(lookup))
        }
    }
}
