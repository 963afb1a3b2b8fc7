//! Workflow Engine
//!
//! Walks a workflow graph from its start node, instantiating each visited node
//! with only the capabilities its type declared and following the routing
//! handle the node leaves in the run state.

use crate::capabilities::CapabilityProviders;
use crate::types::{AppError, Result};
use crate::utils::toml_config::EngineConfig;
use crate::workflows::definition::WorkflowDefinition;
use crate::workflows::graph::WorkflowGraph;
use crate::workflows::nodes::NodeSpec;
use crate::workflows::registry::NodeRegistry;
use crate::workflows::state::RunState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Output from a workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    /// The run state after the last node
    pub final_state: RunState,
    /// Number of steps executed
    pub steps_executed: usize,
    /// Node ids in order of first visit
    pub nodes_visited: Vec<String>,
    /// Detailed reasoning path showing each step
    pub reasoning_path: Vec<WorkflowStep>,
}

/// A single step in the workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub node_id: String,
    pub node_type: String,
    /// Routing handle the node emitted, if any
    pub handle: Option<String>,
    /// `success` as left in the state by this node
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp when this step was executed
    pub timestamp: i64,
    /// Duration of this step in milliseconds
    pub duration_ms: u64,
}

/// Workflow engine shared by concurrent runs
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    registry: Arc<NodeRegistry>,
    providers: Arc<CapabilityProviders>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create a new workflow engine
    pub fn new(registry: Arc<NodeRegistry>, providers: Arc<CapabilityProviders>) -> Self {
        Self {
            registry,
            providers,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the graph-build checks without executing anything
    pub fn validate(&self, definition: &WorkflowDefinition) -> Result<()> {
        WorkflowGraph::build(definition, &self.registry).map(|_| ())
    }

    /// Execute a workflow and return its final state
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        state: RunState,
    ) -> Result<RunState> {
        self.execute_traced(definition, state)
            .await
            .map(|output| output.final_state)
    }

    /// Execute a workflow and return the final state with the step trace
    pub async fn execute_traced(
        &self,
        definition: &WorkflowDefinition,
        state: RunState,
    ) -> Result<WorkflowOutput> {
        self.execute_with_cancel(definition, state, CancellationToken::new())
            .await
    }

    /// Execute a workflow that aborts with [`AppError::Cancelled`] once
    /// `cancel` fires or the configured run timeout elapses
    pub async fn execute_with_cancel(
        &self,
        definition: &WorkflowDefinition,
        state: RunState,
        cancel: CancellationToken,
    ) -> Result<WorkflowOutput> {
        let run = self.run(definition, state, &cancel);

        match self.config.run_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                .await
                .map_err(|_| {
                    cancel.cancel();
                    AppError::Cancelled(format!("run exceeded its {}s timeout", secs))
                })?,
            None => run.await,
        }
    }

    async fn run(
        &self,
        definition: &WorkflowDefinition,
        mut state: RunState,
        cancel: &CancellationToken,
    ) -> Result<WorkflowOutput> {
        let graph = WorkflowGraph::build(definition, &self.registry)?;

        // routing handles are only ever produced by nodes of this run
        state.next_output_handle = None;

        let run_id = uuid::Uuid::new_v4();
        let mut current = graph.start();
        let mut steps: Vec<WorkflowStep> = Vec::new();
        let mut nodes_visited: Vec<String> = Vec::new();

        tracing::info!(%run_id, start = %current.id, nodes = definition.nodes.len(), "Workflow run started");

        loop {
            if steps.len() >= self.config.max_steps {
                return Err(AppError::Configuration(format!(
                    "Workflow exceeded max_steps ({}) at node '{}'; possible cycle",
                    self.config.max_steps, current.id
                )));
            }
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled(format!(
                    "cancelled before node '{}'",
                    current.id
                )));
            }

            let registration = self.registry.resolve(&current.node_type)?;
            let caps = self.providers.scoped(
                &registration.requirements,
                &current.node_type,
                &current.id,
            )?;
            let mut node = (registration.factory)(NodeSpec::from_definition(current), caps)?;

            let timestamp = Utc::now().timestamp();
            let started = Instant::now();

            state = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(AppError::Cancelled(format!(
                        "cancelled while node '{}' was running",
                        current.id
                    )));
                }
                result = node.process(state) => result?,
            };

            let handle = state.take_handle();
            let duration_ms = started.elapsed().as_millis() as u64;

            if state.success == Some(false) {
                tracing::warn!(
                    %run_id,
                    node_id = %current.id,
                    node_type = %current.node_type,
                    error = state.error.as_deref().unwrap_or_default(),
                    "Node reported failure; continuing along its route"
                );
            } else {
                tracing::debug!(
                    %run_id,
                    node_id = %current.id,
                    node_type = %current.node_type,
                    handle = handle.as_deref().unwrap_or_default(),
                    duration_ms,
                    "Node completed"
                );
            }

            steps.push(WorkflowStep {
                node_id: current.id.clone(),
                node_type: current.node_type.clone(),
                handle: handle.clone(),
                success: state.success,
                error: if state.success == Some(false) {
                    state.error.clone()
                } else {
                    None
                },
                timestamp,
                duration_ms,
            });
            if !nodes_visited.contains(&current.id) {
                nodes_visited.push(current.id.clone());
            }

            if current.node_type == "end" {
                break;
            }

            let Some(edge) = graph.next_edge(&current.id, handle.as_deref()) else {
                tracing::info!(
                    %run_id,
                    node_id = %current.id,
                    handle = handle.as_deref().unwrap_or_default(),
                    "No outgoing edge matches; stopping"
                );
                break;
            };

            current = graph.node(&edge.target).ok_or_else(|| {
                AppError::Internal(format!("edge target '{}' vanished", edge.target))
            })?;
        }

        tracing::info!(%run_id, steps = steps.len(), success = ?state.success, "Workflow run finished");

        Ok(WorkflowOutput {
            final_state: state,
            steps_executed: steps.len(),
            nodes_visited,
            reasoning_path: steps,
        })
    }
}
