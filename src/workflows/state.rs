//! The mutable record threaded through every node of one run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys with a fixed meaning to the engine
pub const RESERVED_KEYS: [&str; 3] = ["next_output_handle", "success", "error"];

/// Run state: three reserved fields plus free-form node outputs.
///
/// Serializes to one flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Routing signal for the engine; consumed after every step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_output_handle: Option<String>,
    /// Outcome of the most recent node that reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state for a prompt-driven run
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.insert("prompt", prompt.into());
        state
    }

    /// Build from a JSON object; reserved keys land in their typed fields
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        if let Some(ref handle) = self.next_output_handle {
            map.insert("next_output_handle".to_string(), Value::String(handle.clone()));
        }
        if let Some(success) = self.success {
            map.insert("success".to_string(), Value::Bool(success));
        }
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        Value::Object(map)
    }

    /// Free-form value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Any field, reserved ones included; JSON `null` counts as absent
    pub fn field(&self, key: &str) -> Option<Value> {
        let value = match key {
            "next_output_handle" => self.next_output_handle.clone().map(Value::String),
            "success" => self.success.map(Value::Bool),
            "error" => self.error.clone().map(Value::String),
            _ => self.data.get(key).cloned(),
        };
        value.filter(|v| !v.is_null())
    }

    /// First key among `keys` holding a non-empty string
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get_str(k))
            .find(|s| !s.trim().is_empty())
    }

    /// Set a value; reserved keys are routed to their typed fields
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            "next_output_handle" => {
                self.next_output_handle = value.as_str().map(str::to_string)
            }
            "success" => self.success = value.as_bool(),
            "error" => self.error = value.as_str().map(str::to_string),
            _ => {
                self.data.insert(key, value);
            }
        }
    }

    pub fn mark_success(&mut self) {
        self.success = Some(true);
    }

    /// Record a node-local business failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = Some(false);
        self.error = Some(message.into());
    }

    /// Read and clear the routing signal
    pub fn take_handle(&mut self) -> Option<String> {
        self.next_output_handle.take().filter(|h| !h.is_empty())
    }
}
