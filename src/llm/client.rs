//! LLM Client abstractions and provider selection
//!
//! This module provides a unified interface for the hosting environments a
//! catalog [`LlmEntity`] can point at:
//! - **OpenAI**: chat completions API (also used for `custom` OpenAI-compatible hosts)
//! - **Azure**: Azure OpenAI / AI Foundry deployments
//! - **Ollama**: local inference through `/api/chat`
//! - **Anthropic**: messages API
//!
//! `gcp` and `aws` entities are recognised but rejected with an error.

use crate::types::{AppError, InvocationOptions, LlmEntity, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Hosting environments that [`Provider::from_entity`] can build a client for
pub const SUPPORTED_HOSTING_ENVIRONMENTS: &[&str] =
    &["openai", "azure", "custom", "ollama", "anthropic"];

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";
const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

/// A single prompt completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub options: InvocationOptions,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: InvocationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Run a completion request and return the generated text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(&CompletionRequest::new(prompt)).await
    }

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.complete(&CompletionRequest::new(prompt).with_system(system))
            .await
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
///
/// | Provider | Hosting environments | Auth |
/// |----------|----------------------|------|
/// | OpenAI | `openai`, `custom` | `Authorization: Bearer` |
/// | AzureOpenAI | `azure` | `api-key` header |
/// | Ollama | `ollama` | none |
/// | Anthropic | `anthropic` | `x-api-key` header |
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    /// OpenAI API provider (and OpenAI-compatible self-hosted APIs)
    OpenAI {
        api_key: Option<String>,
        api_base: String,
        model: String,
    },

    /// Azure OpenAI deployment
    AzureOpenAI {
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },

    /// Anthropic Claude API provider
    Anthropic {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl Provider {
    /// Pick the provider for a catalog entity from its hosting environment
    ///
    /// # Errors
    ///
    /// Returns [`AppError::LLM`] if the hosting environment is unsupported or
    /// the entity lacks the endpoint/key the environment needs.
    pub fn from_entity(entity: &LlmEntity) -> Result<Self> {
        let env = entity.hosting_environment.trim().to_lowercase();
        match env.as_str() {
            "openai" => Ok(Provider::OpenAI {
                api_key: entity.api_key.clone(),
                api_base: non_empty(&entity.api_endpoint)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
                model: entity.model_name.clone(),
            }),

            "custom" => {
                let api_base = non_empty(&entity.custom_api_endpoint_url)
                    .or_else(|| non_empty(&entity.api_endpoint))
                    .ok_or_else(|| {
                        AppError::LLM(format!(
                            "LLM '{}' is hosted on a custom endpoint but no endpoint URL is set",
                            entity.id
                        ))
                    })?;
                Ok(Provider::OpenAI {
                    api_key: entity
                        .custom_auth_api_key
                        .clone()
                        .or_else(|| entity.api_key.clone()),
                    api_base,
                    model: entity.model_name.clone(),
                })
            }

            "azure" => {
                let endpoint = non_empty(&entity.azure_endpoint_url)
                    .or_else(|| non_empty(&entity.api_endpoint))
                    .ok_or_else(|| {
                        AppError::LLM(format!(
                            "Azure LLM '{}' has no endpoint URL",
                            entity.id
                        ))
                    })?;
                let api_key = entity
                    .azure_api_key
                    .clone()
                    .or_else(|| entity.api_key.clone())
                    .ok_or_else(|| {
                        AppError::LLM(format!("Azure LLM '{}' has no API key", entity.id))
                    })?;
                Ok(Provider::AzureOpenAI {
                    api_key,
                    endpoint,
                    deployment: non_empty(&entity.azure_deployment_name)
                        .unwrap_or_else(|| entity.model_name.clone()),
                    api_version: non_empty(&entity.azure_api_version)
                        .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                })
            }

            "ollama" => Ok(Provider::Ollama {
                base_url: non_empty(&entity.api_endpoint)
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string()),
                model: entity.model_name.clone(),
            }),

            "anthropic" => Ok(Provider::Anthropic {
                api_key: entity.api_key.clone().ok_or_else(|| {
                    AppError::LLM(format!("Anthropic LLM '{}' has no API key", entity.id))
                })?,
                api_base: non_empty(&entity.api_endpoint)
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE.to_string()),
                model: entity.model_name.clone(),
            }),

            "gcp" | "aws" => Err(AppError::LLM(format!(
                "Hosting environment '{}' is not supported (LLM '{}'). Supported: {}",
                env,
                entity.id,
                SUPPORTED_HOSTING_ENVIRONMENTS.join(", ")
            ))),

            other => Err(AppError::LLM(format!(
                "Unknown hosting environment '{}' for LLM '{}'",
                other, entity.id
            ))),
        }
    }

    /// Create a client instance for this provider sharing the given HTTP pool
    pub fn create_client(&self, http: reqwest::Client) -> Box<dyn LLMClient> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Box::new(super::openai::OpenAIClient::new(
                http,
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )),

            Provider::AzureOpenAI {
                api_key,
                endpoint,
                deployment,
                api_version,
            } => Box::new(super::openai::OpenAIClient::azure(
                http,
                api_key.clone(),
                endpoint,
                deployment.clone(),
                api_version,
            )),

            Provider::Ollama { base_url, model } => Box::new(super::ollama::OllamaClient::new(
                http,
                base_url.clone(),
                model.clone(),
            )),

            Provider::Anthropic {
                api_key,
                api_base,
                model,
            } => Box::new(super::anthropic::AnthropicClient::new(
                http,
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::AzureOpenAI { .. } => "Azure OpenAI",
            Provider::Ollama { .. } => "Ollama",
            Provider::Anthropic { .. } => "Anthropic",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Send a JSON request and decode a JSON response, mapping transport and
/// non-2xx failures to [`AppError::LLM`].
pub(crate) async fn send_json(request: reqwest::RequestBuilder, provider: &str) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::LLM(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::LLM(format!(
            "{} API error ({}): {}",
            provider, status, body
        )));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| AppError::LLM(format!("{} returned invalid JSON: {}", provider, e)))
}
