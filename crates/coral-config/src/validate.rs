//! Validates a parsed, derived config tree against a process's type registries.

use crate::error::ConfigError;
use crate::model::{ConfigModel, Mode};
use coral_types::TypeRegistry;

/// Validates `config` against `registry`:
/// - every receiver/sender `raw_type` must be a registered data type;
/// - a sender requires exactly one registered return type;
/// - a non-null `params` field requires exactly one registered params type;
/// - `meta.mode` must be a supported value (enforced at parse time by [`Mode`]'s deserializer,
///   reiterated here for symmetry with the other checks).
pub fn validate(config: &ConfigModel, registry: &TypeRegistry) -> Result<(), ConfigError> {
    for receiver in &config.meta.receivers {
        registry
            .data
            .lookup(&receiver.raw_type)
            .map_err(|_| ConfigError::UnknownRawType {
                node_id: config.node_id.clone(),
                raw_type: receiver.raw_type.clone(),
            })?;
    }

    if let Some(sender) = &config.meta.sender {
        registry
            .data
            .lookup(&sender.raw_type)
            .map_err(|_| ConfigError::UnknownRawType {
                node_id: config.node_id.clone(),
                raw_type: sender.raw_type.clone(),
            })?;
        if registry.return_type.get().is_none() {
            return Err(ConfigError::MissingReturnType {
                node_id: config.node_id.clone(),
            });
        }
    }

    if config.params.is_some() && registry.params.get().is_none() {
        return Err(ConfigError::MissingParamsType {
            node_id: config.node_id.clone(),
        });
    }

    let _ = match config.meta.mode {
        Mode::PubSub | Mode::Reply => (),
    };

    Ok(())
}
