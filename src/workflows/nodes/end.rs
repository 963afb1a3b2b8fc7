use super::{Node, NodeSpec};
use crate::capabilities::Capabilities;
use crate::types::Result;
use crate::workflows::state::RunState;
use async_trait::async_trait;

/// Terminal node. Publishes the configured output field as `final_llm_response`.
pub struct EndNode {
    id: String,
    output_field: String,
}

impl EndNode {
    pub fn create(spec: NodeSpec, _caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            output_field: spec.string_or("output_field", "llm_response"),
            id: spec.id,
        }))
    }
}

#[async_trait]
impl Node for EndNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "end"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        if let Some(output) = state.field(&self.output_field) {
            state.insert("final_llm_response", output);
        }
        tracing::debug!(node_id = %self.id, output_field = %self.output_field, "Workflow reached end");
        Ok(state)
    }
}
