//! [`LanguageModelInvoker`] backed by the provider clients in this module.

use crate::capabilities::LanguageModelInvoker;
use crate::llm::client::{CompletionRequest, Provider};
use crate::types::{InvocationOptions, LlmEntity, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Dispatches each invocation to the backend matching the entity's hosting
/// environment. Clients are built per call on top of one shared HTTP pool.
#[derive(Clone, Default)]
pub struct ProviderInvoker {
    http: reqwest::Client,
}

impl ProviderInvoker {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Entity defaults, then entity `parameters`, then per-call options
    pub fn merge_options(
        entity: &LlmEntity,
        options: Option<&InvocationOptions>,
    ) -> InvocationOptions {
        let mut merged = InvocationOptions {
            temperature: entity.temperature,
            max_tokens: entity.max_tokens,
            top_p: None,
        };

        let layers = [
            InvocationOptions::from_value(&Value::Object(entity.parameters.clone())),
            options.cloned(),
        ];
        for layer in layers.into_iter().flatten() {
            if layer.temperature.is_some() {
                merged.temperature = layer.temperature;
            }
            if layer.max_tokens.is_some() {
                merged.max_tokens = layer.max_tokens;
            }
            if layer.top_p.is_some() {
                merged.top_p = layer.top_p;
            }
        }
        merged
    }
}

#[async_trait]
impl LanguageModelInvoker for ProviderInvoker {
    async fn invoke(
        &self,
        entity: &LlmEntity,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&InvocationOptions>,
    ) -> Result<String> {
        let provider = Provider::from_entity(entity)?;
        let client = provider.create_client(self.http.clone());

        let mut request =
            CompletionRequest::new(prompt).with_options(Self::merge_options(entity, options));
        if let Some(system) = system_prompt {
            request = request.with_system(system);
        }

        tracing::debug!(
            llm_id = %entity.id,
            provider = provider.name(),
            model = client.model_name(),
            "Invoking language model"
        );
        client.complete(&request).await
    }
}
