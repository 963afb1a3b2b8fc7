use super::{Node, NodeSpec};
use crate::capabilities::{Capabilities, LlmService};
use crate::types::{AppError, InvocationOptions, LlmEntity, Result};
use crate::workflows::state::RunState;
use async_trait::async_trait;
use serde_json::json;

/// Sends the run's prompt to a catalog language model and stores the answer
/// in `llm_response`.
pub struct LlmPromptNode {
    id: String,
    llm: LlmService,
    llm_id: Option<String>,
    system_prompt: Option<String>,
    options: Option<InvocationOptions>,
    entity: Option<LlmEntity>,
}

impl LlmPromptNode {
    pub fn create(spec: NodeSpec, caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            llm: caps.llm()?.clone(),
            llm_id: spec
                .get_str("link")
                .or_else(|| spec.get_str("llm_id"))
                .map(str::to_string),
            system_prompt: spec.get_str("system_prompt").map(str::to_string),
            options: spec.value("parameters").and_then(InvocationOptions::from_value),
            entity: None,
            id: spec.id,
        }))
    }

    /// Fetch (once) and check the configured entity
    async fn entity(&mut self) -> Result<&LlmEntity> {
        if self.entity.is_none() {
            let llm_id = self.llm_id.as_deref().ok_or_else(|| {
                AppError::InvalidInput(
                    "LLM ID not found in node configuration. Expected 'link' or 'llm_id' field."
                        .to_string(),
                )
            })?;

            let entity = self
                .llm
                .lookup
                .get_by_id(llm_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("LLM with ID {} not found", llm_id)))?;

            if !entity.enabled {
                return Err(AppError::InvalidInput(format!(
                    "LLM {} is disabled",
                    entity.name
                )));
            }

            tracing::debug!(
                node_id = %self.id,
                llm = %entity.name,
                hosting_environment = %entity.hosting_environment,
                "Resolved LLM entity"
            );
            self.entity = Some(entity);
        }

        self.entity
            .as_ref()
            .ok_or_else(|| AppError::Internal("LLM entity cache empty".to_string()))
    }

    async fn run(&mut self, prompt: &str) -> Result<String> {
        let entity = self.entity().await?.clone();
        self.llm
            .invoker
            .invoke(
                &entity,
                prompt,
                self.system_prompt.as_deref(),
                self.options.as_ref(),
            )
            .await
    }
}

#[async_trait]
impl Node for LlmPromptNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "llm"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        let prompt = match state.first_str(&["processed_prompt", "prompt"]) {
            Some(p) => p.to_string(),
            None => {
                let message = "No prompt found in state";
                tracing::warn!(node_id = %self.id, "{}", message);
                state.insert("llm_response", message);
                state.fail(message);
                return Ok(state);
            }
        };

        match self.run(&prompt).await {
            Ok(response) => {
                let entity = self.entity.as_ref();
                tracing::info!(
                    node_id = %self.id,
                    prompt_chars = prompt.len(),
                    response_chars = response.len(),
                    "LLM call completed"
                );
                state.insert("llm_response", response);
                state.insert(
                    "llm_metadata",
                    json!({
                        "llm_id": entity.map(|e| e.id.as_str()),
                        "llm_name": entity.map(|e| e.name.as_str()),
                        "model": entity.map(|e| e.model_name.as_str()),
                        "hosting_environment": entity.map(|e| e.hosting_environment.as_str()),
                        "config": entity
                            .and_then(|e| e.additional_config.clone())
                            .unwrap_or_else(|| json!({})),
                    }),
                );
                state.mark_success();
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(node_id = %self.id, error = %e, "LLM prompt failed");
                let entity = self.entity.as_ref();
                state.insert(
                    "llm_response",
                    format!(
                        "I apologize, but I'm currently unable to process your request. Error: {}",
                        e
                    ),
                );
                state.insert(
                    "llm_metadata",
                    json!({
                        "error": e.to_string(),
                        "llm_id": entity.map_or("unknown", |ent| ent.id.as_str()),
                        "hosting_environment": entity
                            .map_or("unknown", |ent| ent.hosting_environment.as_str()),
                    }),
                );
                state.fail(e.to_string());
            }
        }

        Ok(state)
    }
}
