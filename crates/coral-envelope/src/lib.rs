//! The per-frame payload envelope that flows between nodes in a pipeline, and the merge
//! protocol that folds each node's contribution into it.
//!
//! An [`Envelope`] is created once by a head node and re-serialized at every subsequent hop.
//! [`merge::merge_into`] is the single place that mutates it, so every invariant around `raw`,
//! `objects` and `metas` lives there.

pub mod detection;
pub mod envelope;
pub mod merge;
pub mod raw;

pub use detection::{BoundingBox, Detection};
pub use envelope::{now_secs, Envelope};
pub use merge::{merge_into, MergeError, MergeMode, SenderResult};
pub use raw::{RawImageError, RawValue};
