//! Emits the JSON schema the schema publisher sends to the registry: a description of a node's
//! type (receiver/sender raw types and topics, generic params, and the registered params/return
//! classes), not a JSON Schema of the config document itself.

use crate::model::ConfigModel;
use coral_types::TypeRegistry;
use schemars::schema_for;
use serde_json::{json, Value};

/// Builds the schema document a node registers under `{name}/{version}`.
///
/// Mirrors the fields the original parser assembled: the node's declared type name, the raw
/// type/topic of its first receiver and its sender (empty string if absent), the generic params
/// schema, and — when registered — the params and return class schemas.
pub fn build_schema(node_type: &str, config: &ConfigModel, registry: &TypeRegistry) -> Value {
    let receiver = config.meta.receivers.first();
    let sender = config.meta.sender.as_ref();

    let mut doc = json!({
        "node_type": node_type,
        "receiver_raw_type": receiver.map(|r| r.raw_type.clone()).unwrap_or_default(),
        "sender_raw_type": sender.map(|s| s.raw_type.clone()).unwrap_or_default(),
        "receiver_topic": receiver.and_then(|r| r.topic.clone()).unwrap_or_default(),
        "sender_topic": sender.and_then(|s| s.topic.clone()).unwrap_or_default(),
        "generic_cls": schema_for!(crate::model::GenericParamsModel),
    });

    if let Some(params) = registry.params.get() {
        doc["params_cls"] = params.schema;
    }
    if let Some(return_type) = registry.return_type.get() {
        doc["return_cls"] = return_type.schema;
    }

    doc
}

/// Wraps a schema document with the docker image reference the registration POST body requires.
pub fn with_image(mut schema: Value, image: &str) -> Value {
    schema["image"] = json!(image);
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointModel, GenericParamsModel, MetaModel, Mode, ProcessModel};

    fn endpoint() -> EndpointModel {
        EndpointModel {
            node_id: "node1".to_owned(),
            raw_type: "RawImage".to_owned(),
            mware: "zeromq".to_owned(),
            carrier: "tcp".to_owned(),
            blocking: false,
            topic: Some("/node1_RawImage_zeromq".to_owned()),
            socket_sub_port: 1,
            socket_pub_port: 2,
            params: Default::default(),
        }
    }

    #[test]
    fn schema_carries_topic_and_raw_type() {
        let registry = TypeRegistry::new();
        let config = ConfigModel {
            gateway_id: "gw".to_owned(),
            pipeline_id: "pl".to_owned(),
            node_id: "node1".to_owned(),
            process: ProcessModel::default(),
            meta: MetaModel {
                mode: Mode::PubSub,
                receivers: vec![],
                sender: Some(endpoint()),
            },
            generic: GenericParamsModel::default(),
            params: None,
        };

        let schema = build_schema("detector", &config, &registry);
        assert_eq!(schema["node_type"], "detector");
        assert_eq!(schema["sender_raw_type"], "RawImage");
        assert_eq!(schema["sender_topic"], "/node1_RawImage_zeromq");
        assert_eq!(schema["receiver_raw_type"], "");
    }

    #[test]
    fn with_image_adds_field() {
        let schema = with_image(json!({"node_type": "detector"}), "registry/detector:1.0");
        assert_eq!(schema["image"], "registry/detector:1.0");
    }
}
