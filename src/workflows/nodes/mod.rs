//! Built-in workflow nodes
//!
//! A node is created fresh for every visit with its config and the
//! capabilities its type declared, processes the run state once and is then
//! dropped. Business failures are written into the state (`success = false`,
//! `error`); only configuration, capability and cancellation errors are
//! returned as `Err`.

pub mod end;
pub mod if_else;
pub mod intent_extractor;
pub mod llm_prompt;
pub mod rest_api;
pub mod start;
pub mod switch;

use crate::types::Result;
use crate::workflows::definition::NodeDefinition;
use crate::workflows::state::RunState;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use end::EndNode;
pub use if_else::IfElseNode;
pub use intent_extractor::IntentExtractorNode;
pub use llm_prompt::LlmPromptNode;
pub use rest_api::RestApiNode;
pub use start::StartNode;
pub use switch::SwitchNode;

/// One typed step of a workflow graph
#[async_trait]
pub trait Node: Send {
    fn id(&self) -> &str;

    fn node_type(&self) -> &str;

    /// Transform the run state and optionally leave a routing signal in it
    async fn process(&mut self, state: RunState) -> Result<RunState>;
}

/// Routing outcome of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Follow the edge without a source handle
    Default,
    /// `if_else` outcome, rendered as `{node_id}-true` / `{node_id}-false`
    Branch(bool),
    /// `switch` outcome, rendered as the bare label
    Case(String),
}

impl Route {
    /// Handle string written to `next_output_handle`
    pub fn handle(&self, node_id: &str) -> Option<String> {
        match self {
            Route::Default => None,
            Route::Branch(taken) => Some(format!("{}-{}", node_id, taken)),
            Route::Case(label) => Some(label.clone()),
        }
    }

    pub fn apply(&self, state: &mut RunState, node_id: &str) {
        state.next_output_handle = self.handle(node_id);
    }
}

/// Node id, type and effective config handed to a factory
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub id: String,
    pub node_type: String,
    pub config: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, config: Value) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: match config {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    pub fn from_definition(def: &NodeDefinition) -> Self {
        Self {
            id: def.id.clone(),
            node_type: def.node_type.clone(),
            config: def.effective_config(),
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.config.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty, trimmed string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    /// Unsigned integer, accepting numeric strings as the editor sometimes emits them
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.value(key)? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.value(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().to_lowercase().parse().ok(),
            _ => None,
        }
    }
}
