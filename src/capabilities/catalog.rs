//! Entity catalogs: where language-model entities and API descriptors come from.
//!
//! - [`StaticCatalog`] serves entities declared in `agentplane.toml`
//! - [`RemoteCatalog`] fetches them from a control-plane service over HTTP

use super::{ApiDescriptorLookup, LanguageModelLookup};
use crate::types::{ApiDescriptor, AppError, LlmEntity, Result};
use crate::utils::toml_config::{AgentPlaneConfig, ConfigError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// In-memory catalog, immutable once built
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    llms: BTreeMap<String, LlmEntity>,
    apis: BTreeMap<String, ApiDescriptor>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[llms]` and `[rest_apis]` tables, resolving secrets from the environment
    pub fn from_config(config: &AgentPlaneConfig) -> std::result::Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for id in config.llms.keys() {
            catalog = catalog.with_llm(config.llm_entity(id)?);
        }
        for id in config.rest_apis.keys() {
            catalog = catalog.with_api(config.api_descriptor(id)?);
        }
        Ok(catalog)
    }

    pub fn with_llm(mut self, entity: LlmEntity) -> Self {
        self.llms.insert(entity.id.clone(), entity);
        self
    }

    pub fn with_api(mut self, descriptor: ApiDescriptor) -> Self {
        self.apis.insert(descriptor.id.clone(), descriptor);
        self
    }

    pub fn llm_ids(&self) -> impl Iterator<Item = &str> {
        self.llms.keys().map(String::as_str)
    }

    pub fn api_ids(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }
}

#[async_trait]
impl LanguageModelLookup for StaticCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<LlmEntity>> {
        Ok(self.llms.get(id).cloned())
    }
}

#[async_trait]
impl ApiDescriptorLookup for StaticCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<ApiDescriptor>> {
        Ok(self.apis.get(id).cloned())
    }
}

/// Control-plane catalog client
///
/// `GET {base}/api/v1/llms/{id}` and `GET {base}/api/v1/rest-apis/{id}`;
/// a 404 means the entity does not exist.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteCatalog {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let url = format!("{}/api/v1/{}/{}", self.base_url, collection, id);

        let mut request = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .header("X-Service", "AgentPlane");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Catalog request failed");
            AppError::Http(format!("Catalog request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(collection, id, "Catalog entity not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Http(format!(
                "Catalog returned {} for {}/{}",
                status, collection, id
            )));
        }

        response.json::<T>().await.map(Some).map_err(|e| {
            AppError::Http(format!(
                "Catalog returned an invalid {} payload for '{}': {}",
                collection, id, e
            ))
        })
    }
}

#[async_trait]
impl LanguageModelLookup for RemoteCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<LlmEntity>> {
        self.fetch("llms", id).await
    }
}

#[async_trait]
impl ApiDescriptorLookup for RemoteCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<ApiDescriptor>> {
        self.fetch("rest-apis", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_catalog_from_config() {
        let config = AgentPlaneConfig::parse(
            r#"
[llms.fast]
model = "llama3.2"
hosting_environment = "ollama"

[rest_apis.users]
base_url = "http://localhost:9000"
resource_path = "/users/{id}"
"#,
        )
        .unwrap();

        let catalog = StaticCatalog::from_config(&config).unwrap();
        assert_eq!(catalog.llm_ids().collect::<Vec<_>>(), vec!["fast"]);
        assert_eq!(catalog.api_ids().collect::<Vec<_>>(), vec!["users"]);

        let llm = LanguageModelLookup::get_by_id(&catalog, "fast")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(llm.model_name, "llama3.2");
        assert!(LanguageModelLookup::get_by_id(&catalog, "slow")
            .await
            .unwrap()
            .is_none());

        let api = ApiDescriptorLookup::get_by_id(&catalog, "users")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(api.method, "GET");
    }

    #[test]
    fn test_remote_catalog_trims_base_url() {
        let catalog =
            RemoteCatalog::new("http://controltower:8000/", Duration::from_secs(5), None).unwrap();
        assert_eq!(catalog.base_url, "http://controltower:8000");
    }
}
