//! Structured-output schema handle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON Schema that constrains a step's structured output.
///
/// The chain treats the schema as opaque and hands it to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Value);

impl Schema {
    /// Wrap an existing JSON Schema document.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Derive the schema of a Rust type.
    pub fn of<T: JsonSchema>() -> Self {
        Self(schemars::schema_for!(T).to_value())
    }

    /// Borrow the underlying JSON Schema document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Schema {
    fn from(schema: Value) -> Self {
        Self::new(schema)
    }
}
