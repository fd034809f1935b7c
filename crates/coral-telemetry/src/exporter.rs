//! The scheduled, out-of-band metrics publisher: owns its own transport handle on a dedicated
//! topic and fires on a timer independent of the node's data path.

use crate::metrics::{Metrics, MetricsSnapshot};
use crate::topic::{metric_topic, MetricKind};
use coral_transport::{ActivationMode, EndpointSpec, PublisherHandle, TransportAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The system metric names this exporter emits, one topic each.
const SYSTEM_METRIC_NAMES: &[&str] = &[
    "process_frames_count",
    "drop_frames_count_full",
    "drop_frames_count_pass",
    "process_frames_cost",
    "pendding_frames_cost",
];

/// Static identity the exporter stamps into every topic it builds.
#[derive(Debug, Clone)]
pub struct MetricsIdentity {
    /// Organization identifier.
    pub organization_id: String,
    /// Gateway identifier.
    pub gateway_id: String,
    /// Pipeline this node belongs to.
    pub pipeline_id: String,
    /// This node's id.
    pub node_id: String,
}

/// Drives a [`Metrics`] accumulator: periodically snapshots it and publishes each metric as its
/// own message on its own topic, `{"value": <number>}`.
///
/// When `enabled` is false every method is a no-op: the exporter never registers a publisher and
/// [`MetricsExporter::run`] returns immediately.
pub struct MetricsExporter<T: TransportAdapter> {
    identity: MetricsIdentity,
    metrics: Arc<Metrics>,
    transport: Arc<T>,
    publishers: HashMap<&'static str, PublisherHandle>,
    interval: Duration,
    enabled: bool,
}

impl<T: TransportAdapter> MetricsExporter<T> {
    /// Creates a disabled exporter: [`MetricsExporter::activate`] and [`MetricsExporter::run`]
    /// will both be no-ops.
    #[must_use]
    pub fn disabled(identity: MetricsIdentity, metrics: Arc<Metrics>, transport: Arc<T>) -> Self {
        Self {
            identity,
            metrics,
            transport,
            publishers: HashMap::new(),
            interval: Duration::from_secs(10),
            enabled: false,
        }
    }

    /// Creates an enabled exporter that will publish every `interval`.
    #[must_use]
    pub fn enabled(
        identity: MetricsIdentity,
        metrics: Arc<Metrics>,
        transport: Arc<T>,
        interval: Duration,
    ) -> Self {
        Self {
            identity,
            metrics,
            transport,
            publishers: HashMap::new(),
            interval,
            enabled: true,
        }
    }

    /// Registers and activates one publisher per system metric, each on its own
    /// `.../node/<node_id>/<metric_name>/system` topic. No-op when disabled.
    pub async fn activate(&mut self) -> Result<(), coral_transport::TransportError> {
        if !self.enabled {
            return Ok(());
        }
        for &name in SYSTEM_METRIC_NAMES {
            let topic = metric_topic(
                &self.identity.organization_id,
                &self.identity.gateway_id,
                &self.identity.pipeline_id,
                &self.identity.node_id,
                name,
                MetricKind::System,
            );
            let spec = EndpointSpec {
                wire_type: coral_types::WireType::Metrics,
                mware: "zeromq".to_owned(),
                class_name: "Metrics".to_owned(),
                topic,
                carrier: "tcp".to_owned(),
                blocking: false,
                socket_sub_port: 0,
                socket_pub_port: 0,
                params: Default::default(),
            };
            let handle = self.transport.register_publisher(spec).await?;
            self.transport
                .activate_publisher(handle, ActivationMode::Publish)
                .await?;
            let _ = self.publishers.insert(name, handle);
        }
        Ok(())
    }

    /// Publishes one snapshot's worth of metric messages, each to its own metric's topic with body
    /// exactly `{"value": <number>}`. No-op when disabled or not yet activated. Publish failures
    /// are logged and otherwise ignored — a metrics outage must never affect the data path.
    pub async fn publish_once(&self) {
        if !self.enabled || self.publishers.is_empty() {
            return;
        }
        let snapshot = self.metrics.snapshot_and_reset_counters();
        for (name, value) in self.system_values(&snapshot) {
            let Some(&handle) = self.publishers.get(name) else {
                continue;
            };
            let body = serde_json::json!({"value": value});
            if let Err(err) = self.transport.send(handle, body).await {
                tracing::warn!(metric = name, error = %err, "metrics publish failed");
            }
        }
    }

    fn system_values(&self, snapshot: &MetricsSnapshot) -> Vec<(&'static str, f64)> {
        let mut values = vec![
            ("process_frames_count", snapshot.process_frames_count as f64),
            ("drop_frames_count_full", snapshot.drop_frames_full as f64),
            ("drop_frames_count_pass", snapshot.drop_frames_pass as f64),
        ];
        if let Some(mean) = snapshot.process_frames_cost_mean {
            values.push(("process_frames_cost", mean));
        }
        if let Some(mean) = snapshot.pendding_frames_cost_mean {
            values.push(("pendding_frames_cost", mean));
        }
        values
    }

    /// Runs the publish loop forever, firing every `interval`. No-op when disabled. Intended to
    /// be spawned as its own task; the metrics timer must never block node shutdown, so callers
    /// should simply abort the task rather than ask it to drain.
    pub async fn run(mut self) {
        if !self.enabled {
            return;
        }
        if self.publishers.is_empty() {
            if let Err(err) = self.activate().await {
                tracing::warn!(error = %err, "failed to activate metrics publisher, exporter disabled");
                return;
            }
        }
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.publish_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_transport::InProcessTransport;

    #[tokio::test]
    async fn disabled_exporter_never_registers_a_publisher() {
        let metrics = Arc::new(Metrics::new());
        let transport = Arc::new(InProcessTransport::new());
        let identity = MetricsIdentity {
            organization_id: "acme".to_owned(),
            gateway_id: "gw".to_owned(),
            pipeline_id: "pl".to_owned(),
            node_id: "node1".to_owned(),
        };
        let mut exporter = MetricsExporter::disabled(identity, metrics, transport);
        exporter.activate().await.unwrap();
        assert!(exporter.publishers.is_empty());
        exporter.publish_once().await;
    }

    #[tokio::test]
    async fn enabled_exporter_publishes_each_metric_to_its_own_topic() {
        let metrics = Arc::new(Metrics::new());
        metrics.record_processed();
        let transport = Arc::new(InProcessTransport::new());
        let identity = MetricsIdentity {
            organization_id: "acme".to_owned(),
            gateway_id: "gw".to_owned(),
            pipeline_id: "pl".to_owned(),
            node_id: "node1".to_owned(),
        };
        let mut exporter = MetricsExporter::enabled(
            identity,
            metrics,
            transport.clone(),
            Duration::from_secs(10),
        );
        exporter.activate().await.unwrap();
        assert_eq!(exporter.publishers.len(), SYSTEM_METRIC_NAMES.len());

        let subscriber_spec = |topic: &str| coral_transport::EndpointSpec {
            wire_type: coral_types::WireType::Metrics,
            mware: "zeromq".to_owned(),
            class_name: "Metrics".to_owned(),
            topic: topic.to_owned(),
            carrier: "tcp".to_owned(),
            blocking: false,
            socket_sub_port: 0,
            socket_pub_port: 0,
            params: Default::default(),
        };
        let frames_topic = metric_topic("acme", "gw", "pl", "node1", "process_frames_count", MetricKind::System);
        let subscriber = transport
            .register_subscriber(subscriber_spec(&frames_topic))
            .await
            .unwrap();
        transport
            .activate_subscriber(subscriber, ActivationMode::Listen)
            .await
            .unwrap();

        exporter.publish_once().await;

        let received = transport.receive(subscriber).await.unwrap();
        assert_eq!(received, Some(serde_json::json!({"value": 1.0})));
    }
}
