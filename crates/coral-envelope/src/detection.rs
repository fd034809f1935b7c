//! Detection items: the elements of an envelope's `objects` sequence.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x1: i64,
    /// Top edge.
    pub y1: i64,
    /// Right edge.
    pub x2: i64,
    /// Bottom edge.
    pub y2: i64,
}

/// One inference result, e.g. a single detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// The class index assigned by the model.
    pub class_id: i64,
    /// Human-readable label for `class_id`.
    pub label: String,
    /// Detection confidence, typically in `[0, 1]`.
    pub prob: f64,
    /// Bounding box, absent for classification-only results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#box: Option<BoundingBox>,
    /// A stable tracking identifier, absent when the node doesn't track objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Nested detections, e.g. sub-parts of a tracked object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Detection>>,
}
