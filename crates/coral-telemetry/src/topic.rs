//! Builds the topic a metric is published under.

/// The two namespaces a metric can be published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Framework-owned metrics (the ones this crate emits).
    System,
    /// User-defined business metrics a node's own code might emit through the same exporter.
    Business,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            MetricKind::System => "system",
            MetricKind::Business => "business",
        }
    }
}

/// Builds `/<organization_id>/gateway/<gateway_id>/pipeline/<pipeline_id>/node/<node_id>/<metric_name>/<system|business>`.
#[must_use]
pub fn metric_topic(
    organization_id: &str,
    gateway_id: &str,
    pipeline_id: &str,
    node_id: &str,
    metric_name: &str,
    kind: MetricKind,
) -> String {
    format!(
        "/{organization_id}/gateway/{gateway_id}/pipeline/{pipeline_id}/node/{node_id}/{metric_name}/{}",
        kind.as_str()
    )
}
