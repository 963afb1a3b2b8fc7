use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============= Entity Descriptors =============

/// Snapshot of a language-model configuration as served by the entity catalog.
///
/// Secrets are accepted on input but never serialized back out, so an entity
/// can be copied into run-state metadata without leaking credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmEntity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: String,
    pub model_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where the model is hosted: `openai`, `azure`, `custom`, `ollama`, `anthropic`, ...
    pub hosting_environment: String,

    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    // Azure AI Foundry deployments
    #[serde(default)]
    pub azure_endpoint_url: Option<String>,
    #[serde(default)]
    pub azure_deployment_name: Option<String>,
    #[serde(default)]
    pub azure_api_version: Option<String>,
    #[serde(default, skip_serializing)]
    pub azure_api_key: Option<String>,

    // Self-hosted OpenAI-compatible deployments
    #[serde(default)]
    pub custom_api_endpoint_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub custom_auth_api_key: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub additional_config: Option<Value>,
}

/// Snapshot of an external HTTP API as served by the entity catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,
    pub base_url: String,
    #[serde(default)]
    pub resource_path: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing)]
    pub auth_headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_params: Map<String, Value>,
}

/// HTTP methods an API descriptor may use.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

impl ApiDescriptor {
    /// Base URL joined with the (unsubstituted) resource path.
    pub fn endpoint_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.resource_path.as_deref() {
            Some(resource) if !resource.is_empty() => {
                format!("{}/{}", base, resource.trim_start_matches('/'))
            }
            _ => base.to_string(),
        }
    }

    /// Upper-cased HTTP method.
    pub fn method_upper(&self) -> String {
        self.method.trim().to_uppercase()
    }

    /// The method as a request verb; anything outside [`HTTP_METHODS`] is rejected.
    pub fn http_method(&self) -> Result<reqwest::Method> {
        let method = self.method_upper();
        if !HTTP_METHODS.contains(&method.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "REST API {} uses invalid HTTP method '{}'",
                self.name, self.method
            )));
        }
        reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| AppError::InvalidInput(format!("Invalid HTTP method '{}': {}", method, e)))
    }

    /// Whether requests to this API carry a body.
    pub fn sends_body(&self) -> bool {
        matches!(self.method_upper().as_str(), "POST" | "PUT" | "PATCH")
    }
}

// ============= Capability Payloads =============

/// Result of a zero-shot intent classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub intent: String,
    pub confidence: f64,
    #[serde(default)]
    pub all_labels: Vec<String>,
    #[serde(default)]
    pub all_scores: Vec<f64>,
}

/// Per-call generation parameters for a language-model invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvocationOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl InvocationOptions {
    /// Read options from a node's `parameters` object, ignoring unknown keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let options = Self {
            temperature: obj.get("temperature").and_then(Value::as_f64).map(|v| v as f32),
            max_tokens: obj
                .get("max_tokens")
                .and_then(Value::as_u64)
                .map(|v| v.min(u32::MAX as u64) as u32),
            top_p: obj.get("top_p").and_then(Value::as_f64).map(|v| v as f32),
        };
        if options == Self::default() {
            None
        } else {
            Some(options)
        }
    }
}

fn default_true() -> bool {
    true
}

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed workflow definition, unknown node type or exhausted step budget
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A node declared a capability as mandatory and it was not provided
    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors that abort a run instead of being folded into run-state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_) | AppError::Capability(_) | AppError::Cancelled(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
