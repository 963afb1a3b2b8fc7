//! TOML-based configuration for agentplane
//!
//! This module provides declarative configuration for the workflow engine and
//! the capability implementations it is wired to (language models, REST APIs,
//! the intent classifier and an optional remote entity catalog) via a TOML
//! file (`agentplane.toml`).
//!
//! Secrets are never stored in the file itself: entries reference environment
//! variable names (`api_key_env`, `auth_headers_env`) which are resolved when
//! the capability providers are built.

use crate::llm::client::SUPPORTED_HOSTING_ENVIRONMENTS;
use crate::types::{ApiDescriptor, LlmEntity, HTTP_METHODS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from agentplane.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPlaneConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Language-model entities served by the static catalog, keyed by id
    #[serde(default)]
    pub llms: BTreeMap<String, LlmConfig>,

    /// REST API descriptors served by the static catalog, keyed by id
    #[serde(default)]
    pub rest_apis: BTreeMap<String, RestApiConfig>,

    /// Intent classification service
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,

    /// Remote entity catalog; when set, entity lookups go over HTTP
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Engine Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of node visits in one run before it is aborted as a
    /// probable cycle
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Optional wall-clock budget for a whole run
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

fn default_max_steps() -> usize {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            run_timeout_secs: None,
        }
    }
}

// ============= Language Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Display name (defaults to the entry id)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub provider: Option<String>,

    /// Model identifier understood by the hosting backend
    pub model: String,

    pub hosting_environment: String,

    #[serde(default)]
    pub api_endpoint: Option<String>,

    /// Environment variable containing the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub azure_deployment_name: Option<String>,

    #[serde(default)]
    pub azure_api_version: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

// ============= REST API Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestApiConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_method")]
    pub method: String,

    pub base_url: String,

    #[serde(default)]
    pub resource_path: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Header name -> environment variable holding its value
    #[serde(default)]
    pub auth_headers_env: BTreeMap<String, String>,

    #[serde(default)]
    pub query_params: Map<String, Value>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_method() -> String {
    "GET".to_string()
}


// ============= Service Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable containing a bearer token for the catalog
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("LLM '{0}' is not defined in configuration")]
    MissingLlm(String),

    #[error("REST API '{0}' is not defined in configuration")]
    MissingRestApi(String),
}

impl AgentPlaneConfig {
    /// Configuration used when no file is given: no static entities, no
    /// classifier, default engine limits
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: AgentPlaneConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_steps must be greater than zero".to_string(),
            ));
        }

        for (id, llm) in &self.llms {
            let env = llm.hosting_environment.to_lowercase();
            if !SUPPORTED_HOSTING_ENVIRONMENTS.contains(&env.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "LLM '{}' uses unsupported hosting environment '{}' (supported: {})",
                    id,
                    llm.hosting_environment,
                    SUPPORTED_HOSTING_ENVIRONMENTS.join(", ")
                )));
            }
            if let Some(ref key_env) = llm.api_key_env {
                self.validate_env_var(key_env)?;
            }
        }

        for (id, api) in &self.rest_apis {
            let method = api.method.to_uppercase();
            if !HTTP_METHODS.contains(&method.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "REST API '{}' uses invalid HTTP method '{}'",
                    id, api.method
                )));
            }
            if api.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "REST API '{}' has an empty base_url",
                    id
                )));
            }
            for env in api.auth_headers_env.values() {
                self.validate_env_var(env)?;
            }
        }

        if let Some(ref classifier) = self.classifier {
            if classifier.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "classifier.base_url must not be empty".to_string(),
                ));
            }
        }

        if let Some(ref catalog) = self.catalog {
            if catalog.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "catalog.base_url must not be empty".to_string(),
                ));
            }
            if let Some(ref env) = catalog.api_key_env {
                self.validate_env_var(env)?;
            }
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Build the catalog entity for a configured language model
    pub fn llm_entity(&self, id: &str) -> Result<LlmEntity, ConfigError> {
        let llm = self
            .llms
            .get(id)
            .ok_or_else(|| ConfigError::MissingLlm(id.to_string()))?;

        let api_key = match llm.api_key_env {
            Some(ref env) => Some(
                self.resolve_env(env)
                    .ok_or_else(|| ConfigError::MissingEnvVar(env.clone()))?,
            ),
            None => None,
        };

        let hosting_environment = llm.hosting_environment.to_lowercase();
        let is_azure = hosting_environment == "azure";
        let is_custom = hosting_environment == "custom";

        Ok(LlmEntity {
            id: id.to_string(),
            name: llm.name.clone().unwrap_or_else(|| id.to_string()),
            description: llm.description.clone(),
            provider: llm
                .provider
                .clone()
                .unwrap_or_else(|| hosting_environment.clone()),
            model_name: llm.model.clone(),
            enabled: llm.enabled,
            api_endpoint: llm.api_endpoint.clone(),
            api_key: if is_azure || is_custom { None } else { api_key.clone() },
            azure_endpoint_url: if is_azure { llm.api_endpoint.clone() } else { None },
            azure_deployment_name: llm.azure_deployment_name.clone(),
            azure_api_version: llm.azure_api_version.clone(),
            azure_api_key: if is_azure { api_key.clone() } else { None },
            custom_api_endpoint_url: if is_custom { llm.api_endpoint.clone() } else { None },
            custom_auth_api_key: if is_custom { api_key } else { None },
            hosting_environment,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            parameters: Map::new(),
            additional_config: None,
        })
    }

    /// Build the catalog descriptor for a configured REST API
    pub fn api_descriptor(&self, id: &str) -> Result<ApiDescriptor, ConfigError> {
        let api = self
            .rest_apis
            .get(id)
            .ok_or_else(|| ConfigError::MissingRestApi(id.to_string()))?;

        let mut auth_headers = BTreeMap::new();
        for (header, env) in &api.auth_headers_env {
            let value = self
                .resolve_env(env)
                .ok_or_else(|| ConfigError::MissingEnvVar(env.clone()))?;
            auth_headers.insert(header.clone(), value);
        }

        Ok(ApiDescriptor {
            id: id.to_string(),
            name: api.name.clone().unwrap_or_else(|| id.to_string()),
            description: api.description.clone(),
            method: api.method.to_uppercase(),
            base_url: api.base_url.clone(),
            resource_path: api.resource_path.clone(),
            enabled: api.enabled,
            headers: api.headers.clone(),
            auth_headers,
            query_params: api.query_params.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> String {
        r#"
[logging]
level = "debug"
format = "json"

[engine]
max_steps = 50

[llms.router]
model = "llama3.2"
hosting_environment = "ollama"
api_endpoint = "http://localhost:11434"
temperature = 0.1

[llms.planner]
name = "Planner"
model = "gpt-4o-mini"
hosting_environment = "openai"

[rest_apis.weather]
method = "get"
base_url = "https://weather.example.com"
resource_path = "/v1/forecast/{city}"
query_params = { units = "metric" }

[classifier]
base_url = "http://intentclassifier:8000"
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config = AgentPlaneConfig::parse(&create_test_config()).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.engine.max_steps, 50);
        assert_eq!(config.llms.len(), 2);
        assert_eq!(config.rest_apis["weather"].method, "get");
        assert_eq!(config.classifier.as_ref().unwrap().timeout_secs, 30);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = AgentPlaneConfig::parse("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.engine.max_steps, 1000);
        assert!(config.engine.run_timeout_secs.is_none());
        assert!(config.llms.is_empty());
    }

    #[test]
    fn test_validation_zero_max_steps() {
        let result = AgentPlaneConfig::parse("[engine]\nmax_steps = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_unsupported_hosting_environment() {
        let content = r#"
[llms.vertex]
model = "gemini"
hosting_environment = "mainframe"
"#;
        let err = AgentPlaneConfig::parse(content).unwrap_err();
        assert!(err.to_string().contains("unsupported hosting environment"));
    }

    #[test]
    fn test_validation_invalid_method() {
        let content = r#"
[rest_apis.bad]
method = "FETCH"
base_url = "http://localhost"
"#;
        let err = AgentPlaneConfig::parse(content).unwrap_err();
        assert!(err.to_string().contains("invalid HTTP method"));
    }

    #[test]
    fn test_validation_missing_env_var() {
        let content = r#"
[llms.planner]
model = "gpt-4o-mini"
hosting_environment = "openai"
api_key_env = "AGENTPLANE_TEST_SURELY_UNSET_KEY"
"#;
        let result = AgentPlaneConfig::parse(content);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "AGENTPLANE_TEST_SURELY_UNSET_KEY"));
    }

    #[test]
    fn test_llm_entity_from_config() {
        let config = AgentPlaneConfig::parse(&create_test_config()).unwrap();

        let router = config.llm_entity("router").unwrap();
        assert_eq!(router.name, "router");
        assert_eq!(router.provider, "ollama");
        assert_eq!(router.model_name, "llama3.2");
        assert_eq!(router.temperature, Some(0.1));
        assert!(router.enabled);

        let planner = config.llm_entity("planner").unwrap();
        assert_eq!(planner.name, "Planner");
        assert!(planner.api_key.is_none());

        assert!(matches!(
            config.llm_entity("missing"),
            Err(ConfigError::MissingLlm(_))
        ));
    }

    #[test]
    fn test_api_descriptor_from_config() {
        let config = AgentPlaneConfig::parse(&create_test_config()).unwrap();

        let weather = config.api_descriptor("weather").unwrap();
        assert_eq!(weather.method, "GET");
        assert_eq!(
            weather.endpoint_url(),
            "https://weather.example.com/v1/forecast/{city}"
        );
        assert_eq!(weather.query_params["units"], "metric");
        assert!(matches!(
            config.api_descriptor("nope"),
            Err(ConfigError::MissingRestApi(_))
        ));
    }

    #[test]
    fn test_file_not_found() {
        let result = AgentPlaneConfig::load("/definitely/not/here/agentplane.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
