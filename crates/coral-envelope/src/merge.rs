//! The merge protocol: classifying a `sender` callback's return value and folding it into the
//! shared envelope.

use crate::detection::Detection;
use crate::envelope::{now_secs, Envelope};
use crate::raw::RawValue;
use serde::{Deserialize, Serialize};

/// How an interface node's `objects` contribution combines with what's already on the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergeMode {
    /// Concatenate onto the existing sequence (initializing it if absent).
    Append,
    /// Replace the existing sequence outright.
    Overwrite,
}

/// The tagged-variant return type a node's `sender` callback produces.
///
/// This is the Rust rendition of the original's dynamic "inspect the return value's class"
/// dispatch: the three shapes a sender callback may return, corresponding to the three ways a
/// node classifies itself (head / interface / meta). The merge routine below pattern-matches on
/// this directly instead of checking a runtime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SenderResult {
    /// A head node's contribution: the `raw` value for a brand-new envelope.
    First {
        /// The raw payload to install on the envelope.
        raw: RawValue,
    },
    /// An interface node's contribution: a batch of detections plus a combination mode.
    Interface {
        /// How `objects` should combine with the envelope's existing sequence.
        mode: MergeMode,
        /// The detections this node produced.
        objects: Vec<Detection>,
    },
    /// A meta node's contribution: an arbitrary per-node record.
    Meta {
        /// The registered return-type instance, serialized.
        record: serde_json::Value,
    },
}

/// Errors raised while merging a `sender` return value into an envelope.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// A head node returned something other than `SenderResult::First`, or a non-head node
    /// returned `First`.
    #[error("node `{node_id}` returned a {got} result, which is invalid when the envelope {}",
        if is_head { "has no raw value yet (First is required)" } else { "already has a raw value (First is not allowed)" })]
    HeadMismatch {
        /// The node that produced the mismatched result.
        node_id: String,
        /// Whether the envelope was still headless (`raw` unset) at merge time.
        is_head: bool,
        /// A short name for what was actually returned.
        got: &'static str,
    },

    /// The same node id contributed a `metas` entry twice for this frame.
    #[error("node `{node_id}` already wrote a metas entry for this frame (key `{key}`)")]
    DuplicateMetaKey {
        /// The node id that produced the duplicate.
        node_id: String,
        /// The meta key that collided.
        key: String,
    },
}

/// Merges a `sender` callback's classified result into `envelope`, per §4.4 of the node runtime
/// contract, then advances `nodes_cost` and refreshes `timestamp` as every hop must.
///
/// - `First`: only legal when `envelope.raw` is still unset; installs it.
/// - `Interface`: `Append` extends (or initializes) `objects`; `Overwrite` replaces it. Neither
///   variant touches `metas`.
/// - `Meta`: inserts under `node.<node_id>`; a duplicate key aborts the frame without mutating
///   the envelope.
///
/// On success, `envelope.nodes_cost += now - envelope.timestamp` and `envelope.timestamp := now`,
/// matching the per-hop timing invariant every node applies before it re-serializes and sends.
pub fn merge_into(
    envelope: &mut Envelope,
    node_id: &str,
    result: SenderResult,
) -> Result<(), MergeError> {
    let is_head = !envelope.has_raw();

    match result {
        SenderResult::First { raw } => {
            if !is_head {
                return Err(MergeError::HeadMismatch {
                    node_id: node_id.to_owned(),
                    is_head,
                    got: "First",
                });
            }
            envelope.raw = Some(raw);
        }
        SenderResult::Interface { mode, objects } => {
            if is_head {
                return Err(MergeError::HeadMismatch {
                    node_id: node_id.to_owned(),
                    is_head,
                    got: "Interface",
                });
            }
            match mode {
                MergeMode::Overwrite => envelope.objects = Some(objects),
                MergeMode::Append => match &mut envelope.objects {
                    Some(existing) => existing.extend(objects),
                    None => envelope.objects = Some(objects),
                },
            }
        }
        SenderResult::Meta { record } => {
            if is_head {
                return Err(MergeError::HeadMismatch {
                    node_id: node_id.to_owned(),
                    is_head,
                    got: "Meta",
                });
            }
            let key = Envelope::meta_key(node_id);
            let metas = envelope.metas.get_or_insert_with(Default::default);
            if metas.contains_key(&key) {
                return Err(MergeError::DuplicateMetaKey {
                    node_id: node_id.to_owned(),
                    key,
                });
            }
            let _ = metas.insert(key, record);
        }
    }

    let now = now_secs();
    envelope.nodes_cost += now - envelope.timestamp;
    envelope.timestamp = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str) -> Detection {
        Detection {
            class_id: 0,
            label: label.to_owned(),
            prob: 0.9,
            r#box: None,
            id: None,
            objects: None,
        }
    }

    #[test]
    fn head_node_sets_raw_exactly_once() {
        let mut env = Envelope::head("cam0");
        let raw = RawValue::Image {
            width: 64,
            height: 64,
            channels: 3,
            data: vec![0u8; 64 * 64 * 3],
        };
        merge_into(&mut env, "cam0", SenderResult::First { raw: raw.clone() }).unwrap();
        assert!(env.has_raw());
        assert!(env.objects.is_none());
        assert!(env.metas.is_none());

        // A second First on the same envelope is a head/non-head mismatch.
        let err = merge_into(&mut env, "cam0", SenderResult::First { raw }).unwrap_err();
        assert!(matches!(err, MergeError::HeadMismatch { is_head: false, .. }));
    }

    #[test]
    fn append_extends_existing_objects() {
        let mut env = Envelope::head("cam0");
        env.raw = Some(RawValue::Native(serde_json::Value::Null));
        env.objects = Some(vec![detection("a")]);

        merge_into(
            &mut env,
            "yolo",
            SenderResult::Interface {
                mode: MergeMode::Append,
                objects: vec![detection("b")],
            },
        )
        .unwrap();

        let labels: Vec<_> = env
            .objects
            .unwrap()
            .into_iter()
            .map(|d| d.label)
            .collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn overwrite_discards_existing_objects() {
        let mut env = Envelope::head("cam0");
        env.raw = Some(RawValue::Native(serde_json::Value::Null));
        env.objects = Some(vec![detection("a")]);

        merge_into(
            &mut env,
            "yolo",
            SenderResult::Interface {
                mode: MergeMode::Overwrite,
                objects: vec![detection("b")],
            },
        )
        .unwrap();

        let labels: Vec<_> = env
            .objects
            .unwrap()
            .into_iter()
            .map(|d| d.label)
            .collect();
        assert_eq!(labels, vec!["b"]);
    }

    #[test]
    fn meta_key_is_written_at_most_once() {
        let mut env = Envelope::head("cam0");
        env.raw = Some(RawValue::Native(serde_json::Value::Null));

        merge_into(
            &mut env,
            "yolo",
            SenderResult::Meta {
                record: serde_json::json!({"value": 7}),
            },
        )
        .unwrap();
        assert_eq!(
            env.metas.as_ref().unwrap().get("node.yolo").unwrap(),
            &serde_json::json!({"value": 7})
        );

        let err = merge_into(
            &mut env,
            "yolo",
            SenderResult::Meta {
                record: serde_json::json!({"value": 8}),
            },
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::DuplicateMetaKey { .. }));
    }

    #[test]
    fn merge_advances_nodes_cost_and_timestamp() {
        let mut env = Envelope::head("cam0");
        let before_ts = env.timestamp;
        std::thread::sleep(std::time::Duration::from_millis(5));
        env.raw = Some(RawValue::Native(serde_json::Value::Null));
        merge_into(
            &mut env,
            "yolo",
            SenderResult::Meta {
                record: serde_json::json!({}),
            },
        )
        .unwrap();
        assert!(env.timestamp > before_ts);
        assert!(env.nodes_cost > 0.0);
    }
}
