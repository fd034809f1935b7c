//! The per-frame envelope that accumulates results as it traverses a pipeline.

use crate::detection::Detection;
use crate::raw::RawValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Returns the current wall clock as seconds since the Unix epoch.
///
/// Mirrors Python's `time.time()`, which every hop in the original implementation samples to
/// stamp `timestamp` and advance `nodes_cost`.
#[must_use]
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// The frame record shared across a pipeline.
///
/// See the invariants on [`crate::merge::merge_into`]: `raw` is written exactly once by a head
/// node, `metas` entries are written at most once per contributing node, and `timestamp` /
/// `nodes_cost` are updated on every hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// The node that most recently produced this envelope (or, for an idle receiver, the node
    /// that synthesized an empty one).
    pub source_id: String,

    /// Assigned by the head node; immutable afterwards and preserved across every hop.
    pub raw_id: Uuid,

    /// Set exactly once, by a head ("input") node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawValue>,

    /// Wall clock at the time of the most recent send.
    pub timestamp: f64,

    /// Cumulative seconds of processing time from the head node to here.
    pub nodes_cost: f64,

    /// Ordered detection sequence, or absent if no interface node has contributed yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Detection>>,

    /// Per-node return records, keyed by `node.<node_id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metas: Option<HashMap<String, serde_json::Value>>,
}

impl Envelope {
    /// Creates a fresh envelope for a head node about to produce the first `raw` value.
    ///
    /// `raw_id` is assigned here and is immutable for the lifetime of the frame; `raw`, `objects`
    /// and `metas` start empty.
    #[must_use]
    pub fn head(source_id: impl Into<String>) -> Self {
        let now = now_secs();
        Envelope {
            source_id: source_id.into(),
            raw_id: Uuid::new_v4(),
            raw: None,
            timestamp: now,
            nodes_cost: 0.0,
            objects: None,
            metas: None,
        }
    }

    /// Synthesizes the empty envelope an idle receiver produces when the transport adapter
    /// returns the "no message available" sentinel.
    #[must_use]
    pub fn synthesize_idle(source_id: impl Into<String>) -> Self {
        Self::head(source_id)
    }

    /// Returns the meta key a node writes its return record under.
    #[must_use]
    pub fn meta_key(node_id: &str) -> String {
        format!("node.{node_id}")
    }

    /// Whether `raw` has already been set by a head node.
    #[must_use]
    pub fn has_raw(&self) -> bool {
        self.raw.is_some()
    }
}
