//! Wire types: the transport-level serialization classes a data type may declare.
//!
//! The set mirrors what a real pub/sub adapter (ZeroMQ, ROS, ...) is able to carry; the engine
//! itself never interprets the bytes, it only checks that a data type's declared wire type is one
//! the adapter in use actually supports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A transport-level wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    /// An arbitrary, adapter-serializable object (the default).
    NativeObject,
    /// A raw image buffer.
    Image,
    /// A metrics sample.
    Metrics,
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WireType::NativeObject => "NativeObject",
            WireType::Image => "Image",
            WireType::Metrics => "Metrics",
        };
        f.write_str(s)
    }
}

impl WireType {
    /// Parses a wire type name, returning `None` if unrecognized.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "NativeObject" => Some(WireType::NativeObject),
            "Image" => Some(WireType::Image),
            "Metrics" => Some(WireType::Metrics),
            _ => None,
        }
    }
}
