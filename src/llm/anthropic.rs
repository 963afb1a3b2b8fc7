//! Anthropic Claude LLM client implementation
//!
//! Talks to the messages API (`POST {base}/v1/messages`) directly over reqwest.

use crate::llm::client::{send_json, CompletionRequest, LLMClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude client for API-based inference
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `api_base` - API root, normally `https://api.anthropic.com`
    /// * `model` - Model identifier (e.g., "claude-3-5-sonnet-20241022")
    pub fn new(http: reqwest::Client, api_key: String, api_base: String, model: String) -> Self {
        Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        // max_tokens is mandatory for this API
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.options.max_tokens.unwrap_or(1024),
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(ref system) = request.system {
            body["system"] = json!(system);
        }
        if let Some(t) = request.options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = request.options.top_p {
            body["top_p"] = json!(p);
        }
        body
    }

    /// Extract text content from Claude response content blocks
    fn extract_text_content(response: &Value) -> Option<String> {
        let blocks = response["content"].as_array()?;
        let text: String = blocks
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let builder = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(request));

        let response = send_json(builder, "Anthropic").await?;

        Self::extract_text_content(&response)
            .ok_or_else(|| AppError::LLM("No text content in Anthropic response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
