use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::AccessorError;
use crate::fields::Field;

/// Best-effort output of an extraction engine.
///
/// Each field of the canonical schema is an optional capability:
/// `Ok(None)` means the engine has no accessor for it, `Err` means the
/// accessor failed while producing it.
pub trait RawExtractionResult: Send + Sync {
    fn field(&self, field: Field) -> Result<Option<Value>, AccessorError>;

    /// All resolvable fields keyed by their internal names
    fn snapshot(&self) -> Map<String, Value> {
        Field::ALL
            .into_iter()
            .filter_map(|field| match self.field(field) {
                Ok(Some(value)) => Some((field.internal_name().to_string(), value)),
                _ => None,
            })
            .collect()
    }
}

/// Extraction result backed by a field map
#[derive(Debug, Clone, Default)]
pub struct MapExtraction {
    values: HashMap<Field, Result<Value, AccessorError>>,
}

impl MapExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Register an accessor that fails when read
    pub fn with_failure(mut self, field: Field, message: impl Into<String>) -> Self {
        self.values.insert(
            field,
            Err(AccessorError::new(field.internal_name(), message)),
        );
        self
    }

    pub fn insert(&mut self, field: Field, value: impl Into<Value>) {
        self.values.insert(field, Ok(value.into()));
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Build from a map keyed by internal field names; unknown keys are dropped
    pub fn from_snapshot(snapshot: Map<String, Value>) -> Self {
        let values = snapshot
            .into_iter()
            .filter_map(|(key, value)| Field::from_internal_name(&key).map(|f| (f, Ok(value))))
            .collect();
        Self { values }
    }
}

impl RawExtractionResult for MapExtraction {
    fn field(&self, field: Field) -> Result<Option<Value>, AccessorError> {
        match self.values.get(&field) {
            Some(Ok(value)) => Ok(Some(value.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }
}
