//! Errors produced while parsing, deriving, or validating a node's config.

use std::path::PathBuf;

/// Every way loading or validating a config document can fail.
///
/// Every variant is fatal at startup: the process logs the message and exits rather than running
/// with a partially valid config.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Neither `CORAL_NODE_BASE64_DATA` nor `CORAL_NODE_CONFIG_PATH` (nor an explicit path) named
    /// a usable config source.
    #[error("no config source: set CORAL_NODE_BASE64_DATA or CORAL_NODE_CONFIG_PATH")]
    NoSource,

    /// The config file couldn't be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config path's extension was neither `.json` nor `.xml`.
    #[error("unsupported config file extension: {0}")]
    UnsupportedExtension(String),

    /// `CORAL_NODE_BASE64_DATA` was not valid base64.
    #[error("CORAL_NODE_BASE64_DATA is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The decoded document failed to parse as JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded document failed to parse as XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A receiver or sender named a `raw_type` absent from the data-type registry.
    #[error("node `{node_id}`: raw_type `{raw_type}` is not a registered data type")]
    UnknownRawType {
        /// The node whose receiver/sender declared the type.
        node_id: String,
        /// The offending type name.
        raw_type: String,
    },

    /// A sender is configured but the process never registered a return type.
    #[error("node `{node_id}` declares a sender but registered no return type")]
    MissingReturnType {
        /// The node missing a return type registration.
        node_id: String,
    },

    /// The config's `params` field is set but the process never registered a params type.
    #[error("node `{node_id}` has a `params` field but registered no params type")]
    MissingParamsType {
        /// The node missing a params type registration.
        node_id: String,
    },

    /// `meta.mode` was neither `pubsub` nor `reply`.
    #[error("node `{node_id}`: unsupported mode `{mode}` (expected `pubsub` or `reply`)")]
    UnsupportedMode {
        /// The node with the invalid mode.
        node_id: String,
        /// The value that was rejected.
        mode: String,
    },

    /// A registry lookup/registration failed while validating the config.
    #[error(transparent)]
    Registry(#[from] coral_types::RegistryError),

    /// The shared global-nodes-data file couldn't be locked, read, or written.
    #[error("global-nodes-data file error: {0}")]
    GlobalNodesData(String),
}
