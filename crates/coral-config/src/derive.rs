//! Fills in the fields a config document is allowed to leave unset: endpoint topics and ports,
//! resolved against the shared global-nodes-data file.

use crate::error::ConfigError;
use crate::global_nodes::GlobalNodesStore;
use crate::model::{ConfigModel, EndpointModel};

fn derive_endpoint(store: &GlobalNodesStore, endpoint: &mut EndpointModel) -> Result<(), ConfigError> {
    if endpoint.topic.is_some() && endpoint.socket_sub_port != 0 && endpoint.socket_pub_port != 0 {
        return Ok(());
    }
    let resolved = store.get_or_assign(&endpoint.node_id, || endpoint.default_topic())?;
    if endpoint.topic.is_none() {
        endpoint.topic = Some(resolved.topic);
    }
    if endpoint.socket_sub_port == 0 {
        endpoint.socket_sub_port = resolved.socket_sub_port;
    }
    if endpoint.socket_pub_port == 0 {
        endpoint.socket_pub_port = resolved.socket_pub_port;
    }
    Ok(())
}

/// Fills in every receiver's and the sender's (and metrics sender's) unset topic/port fields,
/// consulting `store` and writing any newly-picked assignment back under its file lock.
pub fn derive(config: &mut ConfigModel, store: &GlobalNodesStore) -> Result<(), ConfigError> {
    for receiver in &mut config.meta.receivers {
        derive_endpoint(store, receiver)?;
    }
    if let Some(sender) = &mut config.meta.sender {
        derive_endpoint(store, sender)?;
    }
    if let Some(metrics_sender) = &mut config.generic.metrics_sender {
        derive_endpoint(store, metrics_sender)?;
    }
    Ok(())
}
