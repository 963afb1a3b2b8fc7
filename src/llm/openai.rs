use crate::llm::client::{send_json, CompletionRequest, LLMClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

enum Auth {
    Bearer(Option<String>),
    AzureKey(String),
}

/// Chat-completions client for OpenAI and OpenAI-compatible endpoints
pub struct OpenAIClient {
    http: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
}

impl OpenAIClient {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        api_base: String,
        model: String,
    ) -> Self {
        Self {
            http,
            url: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.filter(|k| !k.is_empty())),
            model,
        }
    }

    /// Client for an Azure OpenAI deployment; the deployment name doubles as the model
    pub fn azure(
        http: reqwest::Client,
        api_key: String,
        endpoint: &str,
        deployment: String,
        api_version: &str,
    ) -> Self {
        Self {
            http,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                api_version
            ),
            auth: Auth::AzureKey(api_key),
            model: deployment,
        }
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(t) = request.options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(m) = request.options.max_tokens {
            body["max_tokens"] = json!(m);
        }
        if let Some(p) = request.options.top_p {
            body["top_p"] = json!(p);
        }
        body
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut builder = self.http.post(&self.url).json(&self.body(request));
        builder = match self.auth {
            Auth::Bearer(Some(ref key)) => builder.bearer_auth(key),
            Auth::Bearer(None) => builder,
            Auth::AzureKey(ref key) => builder.header("api-key", key),
        };

        let response = send_json(builder, "OpenAI").await?;

        response["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
