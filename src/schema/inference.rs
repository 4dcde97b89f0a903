//! Type classification and schema accumulation

use super::types::{CompositeSchema, FieldType};
use serde_json::Value;

/// Classify a single JSON value
///
/// Booleans are checked before numbers. Nested objects, arrays and nulls
/// all become `STRING`.
pub fn classify(value: &Value) -> FieldType {
    match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Object(_) => FieldType::String,
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        Value::Number(_) => FieldType::Float,
        Value::String(_) => FieldType::String,
        Value::Null | Value::Array(_) => FieldType::String,
    }
}

/// Running field-name to type mapping for one inference run
#[derive(Debug, Clone, Default)]
pub struct SchemaAccumulator {
    schema: CompositeSchema,
}

impl SchemaAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one value for a field
    pub fn observe(&mut self, name: &str, value: &Value) {
        let observed = classify(value);
        match self.schema.get(name) {
            None => self.schema.insert(name, observed),
            Some(current) => {
                let widened = current.widen(observed);
                if widened != current {
                    self.schema.set(name, widened);
                }
            }
        }
    }

    /// Record every top-level key of a record
    ///
    /// Returns false when the record is not a JSON object, in which case
    /// nothing is observed.
    pub fn observe_record(&mut self, record: &Value) -> bool {
        let Value::Object(map) = record else {
            return false;
        };
        for (key, value) in map {
            self.observe(key, value);
        }
        true
    }

    /// Current view of the schema
    pub fn schema(&self) -> &CompositeSchema {
        &self.schema
    }

    /// Consume the accumulator and return the schema
    pub fn finish(self) -> CompositeSchema {
        self.schema
    }
}
