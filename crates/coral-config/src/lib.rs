//! Config loading, derived-endpoint binding, registry validation, and schema emission.
//!
//! [`load`] is the entry point a node binary calls at startup: it reads the environment-selected
//! document, fills unset topic/port fields from the shared global-nodes-data file, and validates
//! the result against the process's type registries.

pub mod derive;
pub mod error;
pub mod global_nodes;
pub mod model;
pub mod parse;
pub mod schema;
pub mod shared_memory;
mod validate;

pub use error::ConfigError;
pub use global_nodes::{GlobalNodesStore, NodeEndpoint};
pub use model::{
    ConfigModel, EndpointModel, GenericParamsModel, MetaModel, Mode, ParamValue, ProcessModel,
};
pub use shared_memory::SharedMemoryIdStore;
pub use validate::validate;

use coral_types::TypeRegistry;
use std::path::PathBuf;

/// Environment variable naming the directory that holds lock files and shared state. Defaults to
/// `$HOME/.coral`.
pub const ENV_PIPE_MOUNT_DIR: &str = "CORAL_PIPE_MOUNT_DIR";
/// Environment variable overriding the global-nodes-data file path.
pub const ENV_GLOBAL_DATA_PATH: &str = "CORAL_ALL_NODES_GLOBAL_DATA_PATH";

/// Resolves the mount directory: `CORAL_PIPE_MOUNT_DIR`, or `$HOME/.coral`.
#[must_use]
pub fn mount_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_PIPE_MOUNT_DIR) {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
    PathBuf::from(home).join(".coral")
}

/// Resolves the global-nodes-data file path: `CORAL_ALL_NODES_GLOBAL_DATA_PATH`, or
/// `<mount_dir>/global_nodes_data.json`.
#[must_use]
pub fn global_data_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_GLOBAL_DATA_PATH) {
        return PathBuf::from(path);
    }
    mount_dir().join("global_nodes_data.json")
}

/// Directory the shared-memory id store's per-manager JSON files live under:
/// `<mount_dir>/shared_memory_ids`.
#[must_use]
pub fn shared_memory_store_dir() -> PathBuf {
    mount_dir().join("shared_memory_ids")
}

/// Loads, derives, and validates a node's config in one call: reads the environment-selected
/// document, fills unset receiver/sender endpoint fields from the shared global-nodes-data file,
/// then validates the result against `registry`.
pub fn load(registry: &TypeRegistry) -> Result<ConfigModel, ConfigError> {
    let mut config = parse::load_from_env()?;
    let store = global_nodes::GlobalNodesStore::open(global_data_path())?;
    derive::derive(&mut config, &store)?;
    validate::validate(&config, registry)?;
    Ok(config)
}
