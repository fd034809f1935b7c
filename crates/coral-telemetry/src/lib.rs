//! Per-node metrics: counters and histograms accumulated on the data path, exported out-of-band
//! by a scheduled publisher on its own transport handle.

pub mod common_config;
pub mod exporter;
pub mod metrics;
pub mod topic;

pub use common_config::{CommonConfig, MqttConfig};
pub use exporter::{MetricsExporter, MetricsIdentity};
pub use metrics::{DropAction, Metrics, MetricsSnapshot};
pub use topic::{metric_topic, MetricKind};
