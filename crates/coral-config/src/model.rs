//! The strongly-typed config tree a node parses at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `meta.mode`'s two supported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fire-and-forget publish/subscribe (the default, and the only mode exercised end-to-end).
    PubSub,
    /// Request/reply. Wired through but never exercised upstream; treated as optional to
    /// implement fully.
    Reply,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::PubSub
    }
}

/// The pair of transport-level activation verbs a [`Mode`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeVerbs {
    /// Verb the sender side activates with.
    pub sender: &'static str,
    /// Verb the receiver side activates with.
    pub receiver: &'static str,
}

impl Mode {
    /// Resolves this mode to its transport activation verbs.
    #[must_use]
    pub fn verbs(self) -> ModeVerbs {
        match self {
            Mode::PubSub => ModeVerbs {
                sender: "publish",
                receiver: "listen",
            },
            Mode::Reply => ModeVerbs {
                sender: "reply",
                receiver: "request",
            },
        }
    }
}

/// A scalar config parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

/// Shared fields of a receiver or sender endpoint.
///
/// `topic`, `socket_sub_port` and `socket_pub_port` start unset in the parsed document and are
/// filled in by [`crate::derive`] from the shared global-nodes-data file.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EndpointModel {
    /// The node this endpoint belongs to.
    pub node_id: String,
    /// Name of a registered data type.
    #[serde(default = "default_raw_type")]
    pub raw_type: String,
    /// Middleware backend name (e.g. `"zeromq"`).
    #[serde(default = "default_mware")]
    pub mware: String,
    /// Transport carrier (e.g. `"tcp"`).
    #[serde(default = "default_carrier")]
    pub carrier: String,
    /// Whether `receive` blocks until a message is available.
    #[serde(default)]
    pub blocking: bool,
    /// Topic name. Defaults to `/<node_id>_<raw_type>_<mware>` once derived.
    #[serde(default)]
    pub topic: Option<String>,
    /// Subscribe-side ephemeral port. `0` until derived.
    #[serde(default)]
    pub socket_sub_port: u16,
    /// Publish-side ephemeral port. `0` until derived.
    #[serde(default)]
    pub socket_pub_port: u16,
    /// Adapter-specific extra parameters.
    #[serde(default)]
    pub params: HashMap<String, ParamValue>,
}

fn default_raw_type() -> String {
    "RawImage".to_owned()
}

fn default_mware() -> String {
    "zeromq".to_owned()
}

fn default_carrier() -> String {
    "tcp".to_owned()
}

impl EndpointModel {
    /// The topic this endpoint uses, deriving the default shape if unset.
    #[must_use]
    pub fn default_topic(&self) -> String {
        format!("/{}_{}_{}", self.node_id, self.raw_type, self.mware)
    }
}

/// `meta`: the node's receivers and optional sender, and the activation mode they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaModel {
    /// Activation mode shared by every receiver/sender under this node.
    #[serde(default)]
    pub mode: Mode,
    /// Zero or more subscribed input streams.
    #[serde(default)]
    pub receivers: Vec<EndpointModel>,
    /// At most one published output stream.
    #[serde(default)]
    pub sender: Option<EndpointModel>,
}

/// `process`: worker-pool and queue sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessModel {
    /// Bounded work-queue capacity in parallel mode.
    #[serde(default = "default_max_qsize")]
    pub max_qsize: usize,
    /// Number of worker tasks in parallel mode.
    #[serde(default = "default_process_count")]
    pub count: usize,
    /// Whether the node dispatches to a worker pool (`true`) or runs inline (`false`).
    #[serde(default)]
    pub enable_parallel: bool,
}

fn default_max_qsize() -> usize {
    30
}

fn default_process_count() -> usize {
    3
}

impl Default for ProcessModel {
    fn default() -> Self {
        Self {
            max_qsize: default_max_qsize(),
            count: default_process_count(),
            enable_parallel: false,
        }
    }
}

/// `generic`: frame-skip and metrics knobs.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenericParamsModel {
    /// Admit every `skip_frame + 1`-th frame per source; `0` admits every frame.
    #[serde(default)]
    pub skip_frame: u32,
    /// Whether the metrics exporter runs at all.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    /// Metrics exporter's own sender endpoint, if distinct from the node's.
    #[serde(default)]
    pub metrics_sender: Option<EndpointModel>,
    /// Seconds between metrics publishes.
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for GenericParamsModel {
    fn default() -> Self {
        Self {
            skip_frame: 0,
            enable_metrics: true,
            metrics_sender: None,
            metrics_interval: default_metrics_interval(),
        }
    }
}

/// The top-level config document a node parses at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigModel {
    /// Gateway this node's pipeline runs under.
    #[serde(default = "default_gateway_id")]
    pub gateway_id: String,
    /// Pipeline this node belongs to.
    #[serde(default = "default_pipeline_id")]
    pub pipeline_id: String,
    /// This node's unique id.
    pub node_id: String,
    /// Worker-pool sizing.
    #[serde(default)]
    pub process: ProcessModel,
    /// Receivers/sender and activation mode.
    pub meta: MetaModel,
    /// Frame-skip and metrics knobs.
    #[serde(default)]
    pub generic: GenericParamsModel,
    /// User-defined params, validated against the registered params type if present.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

fn default_gateway_id() -> String {
    "default_gateway".to_owned()
}

fn default_pipeline_id() -> String {
    "default_pipeline".to_owned()
}
