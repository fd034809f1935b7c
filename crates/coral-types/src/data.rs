//! The data-type registry: maps a process's declared data type names to the wire type they
//! travel over and, optionally, a validator applied to every value of that type.

use crate::error::RegistryError;
use crate::wire::WireType;
use coral_envelope::RawValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A validator applied to a [`RawValue`] before a publisher sends it or after a subscriber
/// receives it. Boxed so callers can register either a stateless function pointer or a closure
/// capturing e.g. a schema.
pub type Validator = Arc<dyn Fn(&RawValue) -> Result<(), ValidationError> + Send + Sync>;

/// A validator rejected a value.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// One registered data type: its wire type plus an optional validator.
#[derive(Clone)]
pub struct DataTypeEntry {
    name: String,
    wire_type: WireType,
    validator: Option<Validator>,
}

impl fmt::Debug for DataTypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTypeEntry")
            .field("name", &self.name)
            .field("wire_type", &self.wire_type)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl DataTypeEntry {
    /// The registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wire type this data type travels over.
    #[must_use]
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Runs this entry's validator, if any, against `value`.
    pub fn validate(&self, value: &RawValue) -> Result<(), ValidationError> {
        match &self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

/// Registry of data types a node's `sender`/`receiver` pairs may carry.
///
/// Every process holds one; registration happens once at process startup (mirroring the
/// original's module-level `@register_data_type` decorators), so writers are rare and reads are
/// frequent — a single `RwLock` over a `HashMap` is all the contention this needs.
#[derive(Default)]
pub struct DataTypeRegistry {
    entries: RwLock<HashMap<String, DataTypeEntry>>,
}

impl DataTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a data type under `name` with the given wire type and optional validator.
    ///
    /// Returns [`RegistryError::DuplicateDataType`] if `name` is already registered.
    pub fn register(
        &self,
        name: impl Into<String>,
        wire_type: WireType,
        validator: Option<Validator>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::DuplicateDataType(name));
        }
        let _ = entries.insert(
            name.clone(),
            DataTypeEntry {
                name,
                wire_type,
                validator,
            },
        );
        Ok(())
    }

    /// Looks up a registered data type by name.
    pub fn lookup(&self, name: &str) -> Result<DataTypeEntry, RegistryError> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: "data",
                name: name.to_owned(),
            })
    }

    /// Names of every registered data type, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = DataTypeRegistry::new();
        registry
            .register("RawImage", WireType::Image, None)
            .unwrap();
        let entry = registry.lookup("RawImage").unwrap();
        assert_eq!(entry.name(), "RawImage");
        assert_eq!(entry.wire_type(), WireType::Image);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = DataTypeRegistry::new();
        registry
            .register("RawImage", WireType::Image, None)
            .unwrap();
        let err = registry
            .register("RawImage", WireType::NativeObject, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDataType(n) if n == "RawImage"));
    }

    #[test]
    fn lookup_of_unknown_name_fails() {
        let registry = DataTypeRegistry::new();
        let err = registry.lookup("Missing").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { kind: "data", .. }));
    }

    #[test]
    fn validator_runs_on_validate() {
        let registry = DataTypeRegistry::new();
        let validator: Validator = Arc::new(|value: &RawValue| {
            value
                .validate_as_image()
                .map_err(|e| ValidationError(e.to_string()))
        });
        registry
            .register("RawImage", WireType::Image, Some(validator))
            .unwrap();
        let entry = registry.lookup("RawImage").unwrap();

        let good = RawValue::Image {
            width: 2,
            height: 2,
            channels: 3,
            data: vec![0u8; 12],
        };
        assert!(entry.validate(&good).is_ok());

        let bad = RawValue::Image {
            width: 2,
            height: 2,
            channels: 3,
            data: vec![0u8; 3],
        };
        assert!(entry.validate(&bad).is_err());
    }
}
