//! [`TypeRegistry`]: the three independent registries a process builds at startup, bundled for
//! convenient passing through config validation and the node runtime.

use crate::data::DataTypeRegistry;
use crate::singleton::SingletonTypeRegistry;

/// The complete set of type registrations a process declares: data types (many), a params type
/// (at most one), and a return type (at most one).
pub struct TypeRegistry {
    /// Data types a node's senders/receivers may carry.
    pub data: DataTypeRegistry,
    /// The process's single params type, if it declares one.
    pub params: SingletonTypeRegistry,
    /// The process's single return type, if it declares one.
    pub return_type: SingletonTypeRegistry,
}

impl TypeRegistry {
    /// Creates a fresh, empty registry set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DataTypeRegistry::new(),
            params: SingletonTypeRegistry::new("params"),
            return_type: SingletonTypeRegistry::new("return"),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
