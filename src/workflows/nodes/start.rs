use super::{Node, NodeSpec};
use crate::capabilities::Capabilities;
use crate::types::Result;
use crate::workflows::state::RunState;
use async_trait::async_trait;

/// Entry point of every workflow; passes the state through unchanged
pub struct StartNode {
    id: String,
}

impl StartNode {
    pub fn create(spec: NodeSpec, _caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self { id: spec.id }))
    }
}

#[async_trait]
impl Node for StartNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "start"
    }

    async fn process(&mut self, state: RunState) -> Result<RunState> {
        tracing::debug!(node_id = %self.id, keys = state.data.len(), "Workflow started");
        Ok(state)
    }
}
