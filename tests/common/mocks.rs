//! Mock capability implementations for testing.
//!
//! These stand in for the entity catalog, the language-model invoker and the
//! intent classifier so workflows can run without any network access. Each
//! mock records what it was asked, so tests can assert on the calls nodes made.

use agentplane::capabilities::{
    ApiDescriptorLookup, Classifier, LanguageModelInvoker, LanguageModelLookup,
};
use agentplane::types::{
    ApiDescriptor, AppError, Classification, InvocationOptions, LlmEntity, Result,
};
use agentplane::CapabilityProviders;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a catalog language-model entity
pub fn llm_entity(id: &str) -> LlmEntity {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("{} model", id),
        "provider": "mock",
        "model_name": "mock-model",
        "hosting_environment": "ollama",
    }))
    .expect("valid entity")
}

/// Build a REST API descriptor
pub fn api_descriptor(id: &str, method: &str, base_url: &str, resource_path: &str) -> ApiDescriptor {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("{} api", id),
        "method": method,
        "base_url": base_url,
        "resource_path": resource_path,
    }))
    .expect("valid descriptor")
}

/// One recorded language-model call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub llm_id: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub options: Option<InvocationOptions>,
}

/// In-memory language-model catalog plus a scripted invoker.
///
/// Replies are served in order; once the script runs out, the fallback reply
/// is returned for every further call.
#[derive(Default)]
pub struct MockLanguageModels {
    entities: HashMap<String, LlmEntity>,
    script: Mutex<VecDeque<Result<String>>>,
    fallback: Option<String>,
    invocations: Mutex<Vec<Invocation>>,
    lookups: AtomicUsize,
}

impl MockLanguageModels {
    /// A mock that answers every prompt with `reply`
    pub fn replying(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Default::default()
        }
    }

    /// A mock whose invoker always fails with an LLM error
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: LlmEntity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    /// Queue a reply ahead of the fallback
    pub fn then_reply(self, reply: &str) -> Self {
        self.push(Ok(reply.to_string()));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.push(Err(AppError::LLM(message.to_string())));
        self
    }

    fn push(&self, item: Result<String>) {
        self.script.lock().unwrap().push_back(item);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModelLookup for MockLanguageModels {
    async fn get_by_id(&self, id: &str) -> Result<Option<LlmEntity>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.get(id).cloned())
    }
}

#[async_trait]
impl LanguageModelInvoker for MockLanguageModels {
    async fn invoke(
        &self,
        entity: &LlmEntity,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&InvocationOptions>,
    ) -> Result<String> {
        self.invocations.lock().unwrap().push(Invocation {
            llm_id: entity.id.clone(),
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
            options: options.cloned(),
        });

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| AppError::LLM("Mock LLM failure".to_string()))
    }
}

/// Classifier returning a fixed intent, or failing when built with [`MockClassifier::failing`]
pub struct MockClassifier {
    result: Option<Classification>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockClassifier {
    pub fn returning(intent: &str, confidence: f64) -> Self {
        Self {
            result: Some(Classification {
                intent: intent.to_string(),
                confidence,
                all_labels: vec![intent.to_string()],
                all_scores: vec![confidence],
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Classification> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), labels.to_vec()));
        self.result
            .clone()
            .ok_or_else(|| AppError::Classifier("classifier unavailable".to_string()))
    }
}

/// In-memory API descriptor catalog
#[derive(Default)]
pub struct MockApis {
    apis: HashMap<String, ApiDescriptor>,
}

impl MockApis {
    pub fn with_api(mut self, api: ApiDescriptor) -> Self {
        self.apis.insert(api.id.clone(), api);
        self
    }
}

#[async_trait]
impl ApiDescriptorLookup for MockApis {
    async fn get_by_id(&self, id: &str) -> Result<Option<ApiDescriptor>> {
        Ok(self.apis.get(id).cloned())
    }
}

/// Providers exposing only the language-model service
pub fn llm_providers(models: &Arc<MockLanguageModels>) -> CapabilityProviders {
    CapabilityProviders::new().with_llm_service(models.clone(), models.clone())
}
