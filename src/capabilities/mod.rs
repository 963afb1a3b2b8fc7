//! Capability contracts and the provider map injected into workflow nodes
//!
//! Nodes never see external services directly. Each node type declares the
//! named capabilities it needs ([`CapabilityRequirement`]); for every visit
//! the engine asks [`CapabilityProviders::scoped`] for a [`Capabilities`]
//! value holding exactly those handles and nothing else.

pub mod catalog;
pub mod classifier;

use crate::llm::ProviderInvoker;
use crate::types::{
    ApiDescriptor, AppError, Classification, InvocationOptions, LlmEntity, Result,
};
use crate::utils::toml_config::AgentPlaneConfig;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use catalog::{RemoteCatalog, StaticCatalog};
pub use classifier::HttpClassifier;

// ============= Capability Contracts =============

/// Resolves language-model entities by id.
#[async_trait]
pub trait LanguageModelLookup: Send + Sync {
    /// `Ok(None)` when no entity has that id.
    async fn get_by_id(&self, id: &str) -> Result<Option<LlmEntity>>;
}

/// Runs a prompt against a language-model entity.
#[async_trait]
pub trait LanguageModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        entity: &LlmEntity,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&InvocationOptions>,
    ) -> Result<String>;
}

/// Zero-shot classification of free text against candidate labels.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Classification>;
}

/// Resolves external API descriptors by id.
#[async_trait]
pub trait ApiDescriptorLookup: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<ApiDescriptor>>;
}

// ============= Capability Names & Requirements =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityName {
    /// Language-model lookup + invoker
    LlmService,
    IntentClassifier,
    /// API descriptor lookup
    RestApiService,
}

impl CapabilityName {
    pub const ALL: [CapabilityName; 3] = [
        CapabilityName::LlmService,
        CapabilityName::IntentClassifier,
        CapabilityName::RestApiService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityName::LlmService => "llm_service",
            CapabilityName::IntentClassifier => "intent_classifier",
            CapabilityName::RestApiService => "rest_api_service",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability a node type depends on. Optional requirements are injected
/// as `None` when missing and the node degrades instead of failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRequirement {
    pub name: CapabilityName,
    pub required: bool,
}

impl CapabilityRequirement {
    pub fn required(name: CapabilityName) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub fn optional(name: CapabilityName) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

// ============= Injected Handles =============

/// The `llm_service` capability: entity lookup plus invocation
#[derive(Clone)]
pub struct LlmService {
    pub lookup: Arc<dyn LanguageModelLookup>,
    pub invoker: Arc<dyn LanguageModelInvoker>,
}

/// The subset of capabilities handed to one node instance
#[derive(Clone, Default)]
pub struct Capabilities {
    llm: Option<LlmService>,
    classifier: Option<Arc<dyn Classifier>>,
    api_lookup: Option<Arc<dyn ApiDescriptorLookup>>,
}

impl Capabilities {
    /// No capabilities at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn llm(&self) -> Result<&LlmService> {
        self.llm
            .as_ref()
            .ok_or_else(|| missing(CapabilityName::LlmService))
    }

    pub fn classifier(&self) -> Option<&Arc<dyn Classifier>> {
        self.classifier.as_ref()
    }

    pub fn api_lookup(&self) -> Result<&Arc<dyn ApiDescriptorLookup>> {
        self.api_lookup
            .as_ref()
            .ok_or_else(|| missing(CapabilityName::RestApiService))
    }

    pub fn has(&self, name: CapabilityName) -> bool {
        match name {
            CapabilityName::LlmService => self.llm.is_some(),
            CapabilityName::IntentClassifier => self.classifier.is_some(),
            CapabilityName::RestApiService => self.api_lookup.is_some(),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("llm_service", &self.llm.is_some())
            .field("intent_classifier", &self.classifier.is_some())
            .field("rest_api_service", &self.api_lookup.is_some())
            .finish()
    }
}

fn missing(name: CapabilityName) -> AppError {
    AppError::Capability(format!("capability '{}' was not injected", name))
}

// ============= Provider Map =============

/// Process-wide map of capability implementations, shared by all runs
#[derive(Clone, Default)]
pub struct CapabilityProviders {
    inner: Capabilities,
}

impl CapabilityProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm_service(
        mut self,
        lookup: Arc<dyn LanguageModelLookup>,
        invoker: Arc<dyn LanguageModelInvoker>,
    ) -> Self {
        self.inner.llm = Some(LlmService { lookup, invoker });
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.inner.classifier = Some(classifier);
        self
    }

    pub fn with_api_lookup(mut self, lookup: Arc<dyn ApiDescriptorLookup>) -> Self {
        self.inner.api_lookup = Some(lookup);
        self
    }

    pub fn has(&self, name: CapabilityName) -> bool {
        self.inner.has(name)
    }

    /// Names of the capabilities that are provided
    pub fn names(&self) -> Vec<CapabilityName> {
        CapabilityName::ALL
            .into_iter()
            .filter(|c| self.has(*c))
            .collect()
    }

    /// Build the handle set for one node from its declared requirements only
    ///
    /// # Errors
    ///
    /// [`AppError::Capability`] when a required capability is not provided.
    pub fn scoped(
        &self,
        requirements: &[CapabilityRequirement],
        node_type: &str,
        node_id: &str,
    ) -> Result<Capabilities> {
        let mut caps = Capabilities::none();

        for req in requirements {
            if !self.has(req.name) {
                if req.required {
                    return Err(AppError::Capability(format!(
                        "node '{}' of type '{}' requires capability '{}' which is not provided",
                        node_id, node_type, req.name
                    )));
                }
                tracing::warn!(
                    node_id,
                    node_type,
                    capability = %req.name,
                    "Optional capability not provided; node will degrade"
                );
                continue;
            }

            match req.name {
                CapabilityName::LlmService => caps.llm = self.inner.llm.clone(),
                CapabilityName::IntentClassifier => {
                    caps.classifier = self.inner.classifier.clone()
                }
                CapabilityName::RestApiService => caps.api_lookup = self.inner.api_lookup.clone(),
            }
        }

        Ok(caps)
    }

    /// Wire the reference implementations described by a configuration
    ///
    /// Entity lookups go to the remote catalog when `[catalog]` is set,
    /// otherwise to the static `[llms]` / `[rest_apis]` tables.
    pub fn from_config(config: &AgentPlaneConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let invoker: Arc<dyn LanguageModelInvoker> = Arc::new(ProviderInvoker::new(http));

        let providers = match config.catalog {
            Some(ref catalog) => {
                let token = catalog
                    .api_key_env
                    .as_deref()
                    .and_then(|env| config.resolve_env(env));
                let remote = Arc::new(RemoteCatalog::new(
                    &catalog.base_url,
                    Duration::from_secs(catalog.timeout_secs),
                    token,
                )?);
                tracing::info!(base_url = %catalog.base_url, "Using remote entity catalog");
                Self::new()
                    .with_llm_service(remote.clone(), invoker)
                    .with_api_lookup(remote)
            }
            None => {
                let local = Arc::new(
                    StaticCatalog::from_config(config)
                        .map_err(|e| AppError::Configuration(e.to_string()))?,
                );
                Self::new()
                    .with_llm_service(local.clone(), invoker)
                    .with_api_lookup(local)
            }
        };

        let providers = match config.classifier {
            Some(ref classifier) => providers.with_classifier(Arc::new(HttpClassifier::new(
                &classifier.base_url,
                Duration::from_secs(classifier.timeout_secs),
            )?)),
            None => providers,
        };

        Ok(providers)
    }
}

impl fmt::Debug for CapabilityProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProviders")
            .field("provided", &self.names())
            .finish()
    }
}
