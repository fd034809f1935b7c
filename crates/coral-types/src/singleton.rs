//! The params and return registries: unlike [`crate::data::DataTypeRegistry`], each of these
//! accepts at most one registration per process, since a node binary declares the shape of its
//! own params and return value statically, exactly once.

use crate::error::RegistryError;
use parking_lot::RwLock;
use serde_json::Value;

/// One entry in a [`SingletonTypeRegistry`]: a name plus its JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SingletonTypeEntry {
    /// The registered type's name.
    pub name: String,
    /// The JSON schema describing its shape, used by the schema publisher and by config
    /// validation.
    pub schema: Value,
}

/// A registry that enforces a cardinality of at most one entry.
///
/// Used for both the params registry and the return-type registry; `kind` distinguishes them in
/// error messages ("params" or "return").
pub struct SingletonTypeRegistry {
    kind: &'static str,
    entry: RwLock<Option<SingletonTypeEntry>>,
}

impl SingletonTypeRegistry {
    /// Creates an empty registry. `kind` is used verbatim in error messages, e.g. `"params"`.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entry: RwLock::new(None),
        }
    }

    /// Registers the process's single params/return type.
    ///
    /// Returns [`RegistryError::CardinalityExceeded`] if a type is already registered, naming the
    /// existing entry.
    pub fn register(&self, name: impl Into<String>, schema: Value) -> Result<(), RegistryError> {
        let mut slot = self.entry.write();
        if let Some(existing) = slot.as_ref() {
            return Err(RegistryError::CardinalityExceeded {
                kind: self.kind,
                existing: existing.name.clone(),
            });
        }
        *slot = Some(SingletonTypeEntry {
            name: name.into(),
            schema,
        });
        Ok(())
    }

    /// Returns the registered entry, if any.
    #[must_use]
    pub fn get(&self) -> Option<SingletonTypeEntry> {
        self.entry.read().clone()
    }

    /// Looks up the registered entry by name, for symmetry with [`crate::data::DataTypeRegistry`].
    ///
    /// Returns [`RegistryError::NotFound`] if nothing is registered, or if `name` doesn't match
    /// the registered entry.
    pub fn lookup(&self, name: &str) -> Result<SingletonTypeEntry, RegistryError> {
        match self.entry.read().as_ref() {
            Some(entry) if entry.name == name => Ok(entry.clone()),
            _ => Err(RegistryError::NotFound {
                kind: self.kind,
                name: name.to_owned(),
            }),
        }
    }
}
