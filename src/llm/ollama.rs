use crate::llm::client::{send_json, CompletionRequest, LLMClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Client for a local Ollama server's chat endpoint
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        // Ollama takes generation parameters under `options`, max tokens as `num_predict`
        let mut options = Map::new();
        if let Some(t) = request.options.temperature {
            options.insert("temperature".to_string(), json!(t));
        }
        if let Some(m) = request.options.max_tokens {
            options.insert("num_predict".to_string(), json!(m));
        }
        if let Some(p) = request.options.top_p {
            options.insert("top_p".to_string(), json!(p));
        }

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }
        body
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let builder = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.body(request));

        let response = send_json(builder, "Ollama").await?;

        response["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::LLM("Ollama response had no message content".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvocationOptions;

    #[test]
    fn test_options_renamed_for_ollama() {
        let client = OllamaClient::new(
            reqwest::Client::new(),
            "http://localhost:11434/".to_string(),
            "llama3.2".to_string(),
        );
        let body = client.body(&CompletionRequest::new("hi").with_options(InvocationOptions {
            max_tokens: Some(32),
            top_p: Some(0.9),
            ..Default::default()
        }));

        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 32);
        assert!(body["options"].get("temperature").is_none());
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_no_options_object_when_unset() {
        let client = OllamaClient::new(
            reqwest::Client::new(),
            "http://localhost:11434".to_string(),
            "llama3.2".to_string(),
        );
        let body = client.body(&CompletionRequest::new("hi"));
        assert!(body.get("options").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
