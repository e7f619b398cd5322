// Gauge key formatting and validation

use std::fmt;

/// Maximum length of a single key component.
///
/// Namespaces and pod names are DNS labels/subdomains, so anything longer than
/// 253 bytes cannot be a real identity and is rejected before hitting the
/// backend.
pub const MAX_COMPONENT_LENGTH: usize = 253;

/// Identity of one stored gauge, without the deployment context prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GaugeKey {
    pub namespace: String,
    pub instance: String,
    pub metric: String,
}

impl GaugeKey {
    pub fn new(
        namespace: impl Into<String>,
        instance: impl Into<String>,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            instance: instance.into(),
            metric: metric.into(),
        }
    }
}

impl fmt::Display for GaugeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.instance, self.metric)
    }
}

/// Formats a backend key with the context prefix
///
/// # Format
/// `"{context}:{namespace}:{instance}:{metric}"`
///
/// # Example
/// `"activescale:tcn:billing:pod-7:active_requests"`
pub fn format_key(context: &str, key: &GaugeKey) -> String {
    format!(
        "{}:{}:{}:{}",
        context, key.namespace, key.instance, key.metric
    )
}

/// Validates a gauge key before any backend operation
///
/// # Errors
/// Returns the first failing component, see `validate_component`.
pub fn validate_key(key: &GaugeKey) -> Result<(), String> {
    validate_component("namespace", &key.namespace)?;
    validate_component("instance", &key.instance)?;
    validate_component("metric", &key.metric)
}

/// Validates one key component
///
/// # Errors
/// Returns an error message if the component:
/// - is empty
/// - contains a `:` (would alias another key)
/// - contains null bytes or whitespace
/// - exceeds `MAX_COMPONENT_LENGTH`
pub fn validate_component(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} is empty", field));
    }
    if value.contains(':') {
        return Err(format!("{} '{}' contains ':'", field, value));
    }
    if value.contains('\0') || value.chars().any(char::is_whitespace) {
        return Err(format!("{} contains null bytes or whitespace", field));
    }
    if value.len() > MAX_COMPONENT_LENGTH {
        return Err(format!(
            "{} exceeds {} bytes",
            field, MAX_COMPONENT_LENGTH
        ));
    }
    Ok(())
}
