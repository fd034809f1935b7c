//! Type registries a process builds at startup: data types (many, keyed by name), and the
//! cardinality-one params and return types.

pub mod data;
pub mod error;
pub mod registry;
pub mod singleton;
pub mod wire;

pub use data::{DataTypeEntry, DataTypeRegistry, ValidationError, Validator};
pub use error::RegistryError;
pub use registry::TypeRegistry;
pub use singleton::{SingletonTypeEntry, SingletonTypeRegistry};
pub use wire::WireType;
