use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value state threaded along one traversal path.
///
/// Handlers never remove keys: each returns its input plus its own fields,
/// so a node sees everything its ancestors on that path produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    fields: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `key` into the context, replacing an earlier value of the same name.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Outcome of the most recent condition on this path.
    pub fn condition_result(&self) -> Option<bool> {
        self.get("conditionResult").and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
