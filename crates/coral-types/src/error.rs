//! Errors produced by the type registries.

/// Errors raised while registering or looking up a type.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    /// A data type name was registered more than once.
    #[error("data type `{0}` is already registered")]
    DuplicateDataType(String),

    /// A data type declares a wire type the transport adapter does not support.
    #[error("wire type `{wire_type}` requested by data type `{name}` is not supported by the transport adapter")]
    UnsupportedWireType {
        /// Name of the offending data type.
        name: String,
        /// The unsupported wire type.
        wire_type: String,
    },

    /// A params or return type was registered when one already exists.
    ///
    /// The params and return registries enforce a cardinality of at most one entry: a node
    /// binary declares its shape once, statically.
    #[error("{kind} type already registered as `{existing}`; at most one {kind} type is allowed per process")]
    CardinalityExceeded {
        /// Either "params" or "return".
        kind: &'static str,
        /// Name of the entry that is already registered.
        existing: String,
    },

    /// Lookup of a name that was never registered.
    #[error("no `{kind}` type registered under name `{name}`")]
    NotFound {
        /// Either "data", "params" or "return".
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },
}
