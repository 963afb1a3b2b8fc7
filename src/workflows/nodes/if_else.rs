use super::{Node, NodeSpec, Route};
use crate::capabilities::Capabilities;
use crate::types::Result;
use crate::workflows::operators::{self, stringify};
use crate::workflows::state::RunState;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Two-way branch on a single state field
pub struct IfElseNode {
    id: String,
    field: Option<String>,
    operator: String,
    expected: Value,
}

impl IfElseNode {
    pub fn create(spec: NodeSpec, _caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            field: spec.get_str("condition_field").map(str::to_string),
            operator: spec.string_or("condition_operator", "equals"),
            expected: spec
                .value("condition_value")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
            id: spec.id,
        }))
    }

    /// Both branches
    pub fn outcomes(_spec: &NodeSpec) -> Vec<Route> {
        vec![Route::Branch(true), Route::Branch(false)]
    }

    fn evaluate(&self, field: &str, state: &RunState) -> (bool, String) {
        let Some(actual) = state.field(field) else {
            return (
                false,
                format!("Field '{}' not found in workflow state", field),
            );
        };

        match operators::evaluate(&self.operator, &actual, &self.expected) {
            Ok(result) => (
                result,
                format!(
                    "Condition '{} {} {}' evaluated to {}",
                    stringify(&actual),
                    self.operator,
                    stringify(&self.expected),
                    result
                ),
            ),
            Err(e) => {
                tracing::warn!(node_id = %self.id, error = %e, "Condition could not be evaluated");
                (false, e.to_string())
            }
        }
    }
}

#[async_trait]
impl Node for IfElseNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "if_else"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        let Some(field) = self.field.clone() else {
            let message = "No condition field specified in IF-ELSE node configuration";
            tracing::error!(node_id = %self.id, "{}", message);
            state.insert("if_else_result", "error");
            state.insert("if_else_reason", message);
            state.fail(message);
            Route::Branch(false).apply(&mut state, &self.id);
            return Ok(state);
        };

        let (result, reason) = self.evaluate(&field, &state);
        tracing::info!(node_id = %self.id, field = %field, operator = %self.operator, result, "Condition evaluated");

        state.insert(
            "if_else_metadata",
            json!({
                "node_id": self.id,
                "field_value": state.field(&field),
                "expected_value": self.expected,
                "operator": self.operator,
                "result": result,
                "evaluation_message": reason,
            }),
        );
        state.insert("if_else_result", result.to_string());
        state.insert("if_else_reason", reason);
        state.insert("if_else_field", field);
        state.insert("if_else_operator", self.operator.clone());
        state.insert("if_else_value", self.expected.clone());
        state.mark_success();

        Route::Branch(result).apply(&mut state, &self.id);
        Ok(state)
    }
}
