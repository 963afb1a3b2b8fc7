use super::{Node, NodeSpec, Route};
use crate::capabilities::Capabilities;
use crate::types::Result;
use crate::workflows::operators::{self, stringify};
use crate::workflows::state::RunState;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
struct SwitchCase {
    value: Value,
    operator: String,
    output: String,
}

/// Multi-way branch: first matching case wins, otherwise the default label
pub struct SwitchNode {
    id: String,
    field: Option<String>,
    cases: Vec<SwitchCase>,
    raw_cases: Value,
    default_case: String,
}

impl SwitchNode {
    pub fn create(spec: NodeSpec, _caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            field: spec.get_str("switch_field").map(str::to_string),
            cases: Self::parse_cases(&spec),
            raw_cases: spec.value("switch_cases").cloned().unwrap_or(json!([])),
            default_case: spec.string_or("default_case", "default"),
            id: spec.id,
        }))
    }

    fn parse_cases(spec: &NodeSpec) -> Vec<SwitchCase> {
        spec.value("switch_cases")
            .and_then(Value::as_array)
            .map(|cases| {
                cases
                    .iter()
                    .enumerate()
                    .map(|(i, case)| SwitchCase {
                        value: case.get("value").cloned().unwrap_or(Value::Null),
                        operator: case
                            .get("operator")
                            .and_then(Value::as_str)
                            .unwrap_or("equals")
                            .to_string(),
                        output: case
                            .get("output")
                            .and_then(Value::as_str)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("case_{}", i)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every case output plus the default label
    pub fn outcomes(spec: &NodeSpec) -> Vec<Route> {
        let mut outcomes: Vec<Route> = Self::parse_cases(spec)
            .into_iter()
            .map(|c| Route::Case(c.output))
            .collect();
        outcomes.push(Route::Case(spec.string_or("default_case", "default")));
        outcomes
    }

    fn evaluate(&self, field: &str, state: &RunState) -> (String, String) {
        let Some(actual) = state.field(field) else {
            return (
                self.default_case.clone(),
                format!("Field '{}' not found, using default case", field),
            );
        };
        let shown = stringify(&actual);

        for (i, case) in self.cases.iter().enumerate() {
            match operators::evaluate(&case.operator, &actual, &case.value) {
                Ok(true) => {
                    return (
                        case.output.clone(),
                        format!(
                            "Matched case {}: '{}' {} '{}'",
                            i,
                            shown,
                            case.operator,
                            stringify(&case.value)
                        ),
                    )
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(node_id = %self.id, case = i, error = %e, "Skipping switch case");
                }
            }
        }

        (
            self.default_case.clone(),
            format!(
                "No cases matched for value '{}', using default case",
                shown
            ),
        )
    }

    fn fail(&self, state: &mut RunState, message: &str) {
        tracing::error!(node_id = %self.id, "{}", message);
        state.insert("switch_result", "error");
        state.insert("switch_reason", message);
        state.fail(message);
        Route::Case(self.default_case.clone()).apply(state, &self.id);
    }
}

#[async_trait]
impl Node for SwitchNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "switch"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        let Some(field) = self.field.clone() else {
            self.fail(
                &mut state,
                "No switch field specified in SWITCH node configuration",
            );
            return Ok(state);
        };
        if self.cases.is_empty() {
            self.fail(
                &mut state,
                "No switch cases defined in SWITCH node configuration",
            );
            return Ok(state);
        }

        let (output, reason) = self.evaluate(&field, &state);
        tracing::info!(node_id = %self.id, field = %field, output = %output, "Switch evaluated");

        state.insert(
            "switch_metadata",
            json!({
                "node_id": self.id,
                "field_value": state.field(&field),
                "cases": self.raw_cases,
                "default_case": self.default_case,
                "result": output,
                "evaluation_message": reason,
            }),
        );
        state.insert("switch_result", output.clone());
        state.insert("switch_reason", reason);
        state.insert("switch_field", field);
        state.insert("switch_cases_count", self.cases.len());
        state.mark_success();

        Route::Case(output).apply(&mut state, &self.id);
        Ok(state)
    }
}
