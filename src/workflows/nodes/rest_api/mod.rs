//! `rest_api` node: an intelligence LLM maps the run state onto a configured
//! HTTP API, then the call is made with bounded retries.

pub mod request;
pub mod transport;

use super::{Node, NodeSpec};
use crate::capabilities::{ApiDescriptorLookup, Capabilities, LlmService};
use crate::types::{ApiDescriptor, AppError, LlmEntity, Result};
use crate::workflows::state::RunState;
use async_trait::async_trait;
use request::{build_prompt, PreparedRequest, RequestPlan};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use transport::{HttpResponseRecord, HttpTransport, RetryPolicy, TransportConfig};

pub struct RestApiNode {
    id: String,
    api_lookup: Arc<dyn ApiDescriptorLookup>,
    llm: LlmService,
    api_id: Option<String>,
    intel_id: String,
    transport: HttpTransport,
    api: Option<ApiDescriptor>,
    intel: Option<LlmEntity>,
}

impl RestApiNode {
    pub fn create(spec: NodeSpec, caps: Capabilities) -> Result<Box<dyn Node>> {
        let intel_id = spec.get_str("intel_link").map(str::to_string).ok_or_else(|| {
            AppError::Capability(format!(
                "RestApiNode '{}' requires an LLM configuration (intel_link) for intelligent request processing",
                spec.id
            ))
        })?;

        let transport = HttpTransport::new(&Self::transport_config(&spec))?;

        Ok(Box::new(Self {
            api_lookup: caps.api_lookup()?.clone(),
            llm: caps.llm()?.clone(),
            api_id: spec
                .get_str("link")
                .or_else(|| spec.get_str("rest_api_id"))
                .map(str::to_string),
            intel_id,
            transport,
            api: None,
            intel: None,
            id: spec.id,
        }))
    }

    fn transport_config(spec: &NodeSpec) -> TransportConfig {
        let defaults = TransportConfig::default();
        let retry = RetryPolicy::default();
        TransportConfig {
            timeout: spec
                .get_u64("timeout")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            follow_redirects: spec
                .get_bool("follow_redirects")
                .unwrap_or(defaults.follow_redirects),
            retry: RetryPolicy {
                retry_count: spec
                    .get_u64("retry_count")
                    .map(|n| n.min(u32::MAX as u64) as u32)
                    .unwrap_or(retry.retry_count),
                backoff_ms: spec.get_u64("retry_backoff_ms").unwrap_or(retry.backoff_ms),
                max_backoff_ms: spec
                    .get_u64("retry_max_backoff_ms")
                    .unwrap_or(retry.max_backoff_ms),
            },
        }
    }

    /// The intelligence LLM; any failure to resolve it is a capability error
    async fn intel_entity(&mut self) -> Result<LlmEntity> {
        if let Some(ref entity) = self.intel {
            return Ok(entity.clone());
        }

        let entity = match self.llm.lookup.get_by_id(&self.intel_id).await {
            Ok(Some(entity)) if entity.enabled => entity,
            Ok(Some(entity)) => {
                return Err(AppError::Capability(format!(
                    "intelligence LLM {} for node '{}' is disabled",
                    entity.name, self.id
                )))
            }
            Ok(None) => {
                return Err(AppError::Capability(format!(
                    "intelligence LLM {} for node '{}' not found",
                    self.intel_id, self.id
                )))
            }
            Err(e) => {
                return Err(AppError::Capability(format!(
                    "failed to fetch intelligence LLM {} for node '{}': {}",
                    self.intel_id, self.id, e
                )))
            }
        };

        self.intel = Some(entity.clone());
        Ok(entity)
    }

    async fn api_descriptor(&mut self) -> Result<ApiDescriptor> {
        if let Some(ref api) = self.api {
            return Ok(api.clone());
        }

        let api_id = self.api_id.as_deref().ok_or_else(|| {
            AppError::InvalidInput(
                "REST API ID not found in node configuration. Expected 'link' or 'rest_api_id' field."
                    .to_string(),
            )
        })?;

        let api = self
            .api_lookup
            .get_by_id(api_id)
            .await
            .map_err(|e| AppError::NotFound(format!("Failed to fetch REST API: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("REST API with ID {} not found", api_id)))?;

        if !api.enabled {
            return Err(AppError::InvalidInput(format!(
                "REST API {} is disabled",
                api.name
            )));
        }
        api.http_method()?;

        tracing::debug!(
            node_id = %self.id,
            api = %api.name,
            method = %api.method_upper(),
            url = %api.endpoint_url(),
            "Resolved REST API descriptor"
        );
        self.api = Some(api.clone());
        Ok(api)
    }

    async fn call(&mut self, state: &RunState, intel: &LlmEntity) -> Result<HttpResponseRecord> {
        let api = self.api_descriptor().await?;

        let prompt = build_prompt(&api, state);
        let answer = self
            .llm
            .invoker
            .invoke(intel, &prompt, None, None)
            .await
            .map_err(|e| AppError::LLM(format!("Intelligent request building failed: {}", e)))?;

        let plan = RequestPlan::parse(&answer)?;
        let request = PreparedRequest::build(&api, &plan)?;
        Ok(self.transport.send_with_retry(&request).await)
    }
}

#[async_trait]
impl Node for RestApiNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "rest_api"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        let intel = self.intel_entity().await?;

        match self.call(&state, &intel).await {
            Ok(record) => {
                tracing::info!(
                    node_id = %self.id,
                    status = record.status_code,
                    attempts = record.attempts,
                    success = record.success,
                    "REST API call finished"
                );

                let error = if record.success {
                    None
                } else {
                    Some(record.error.clone().unwrap_or_else(|| {
                        format!(
                            "{} {} returned status {}",
                            record.method, record.url, record.status_code
                        )
                    }))
                };

                state.insert("response", record.data.clone());
                state.insert("status_code", record.status_code);
                state.insert(
                    "http_response",
                    serde_json::to_value(&record).unwrap_or(Value::Null),
                );
                match error {
                    Some(message) => state.fail(message),
                    None => state.mark_success(),
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(node_id = %self.id, error = %e, "REST API node failed");
                state.insert("response", Value::Null);
                state.insert("status_code", 0);
                state.fail(e.to_string());
            }
        }

        Ok(state)
    }
}
