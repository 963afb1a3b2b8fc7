//! # agentplane
//!
//! An execution engine for agent workflows built in a visual editor. A
//! workflow is a graph of typed nodes joined by edges; the engine walks it
//! from the single `start` node, threading one [`RunState`] through every
//! node and following the routing handle each node leaves behind.
//!
//! ## Overview
//!
//! agentplane can be used in two ways:
//!
//! 1. **As a CLI** - Run the `agentplane` binary against a workflow JSON file
//! 2. **As a library** - Embed [`WorkflowEngine`] with your own capabilities
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use agentplane::{AgentPlaneConfig, CapabilityProviders, NodeRegistry, RunState,
//!     WorkflowDefinition, WorkflowEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AgentPlaneConfig::load("agentplane.toml")?;
//!     let engine = WorkflowEngine::new(
//!         Arc::new(NodeRegistry::with_builtin_nodes()),
//!         Arc::new(CapabilityProviders::from_config(&config)?),
//!     )
//!     .with_config(config.engine.clone());
//!
//!     let definition = WorkflowDefinition::load("support_flow.json")?;
//!     let state = engine
//!         .execute(&definition, RunState::from_prompt("Where is order 1234?"))
//!         .await?;
//!     println!("{}", state.to_value());
//!     Ok(())
//! }
//! ```
//!
//! ### Custom capabilities
//!
//! Nodes never reach for global services. Each node type declares the
//! capabilities it needs and receives only those. Any implementation of the
//! traits in [`capabilities`] can be plugged in:
//!
//! ```rust,ignore
//! let providers = CapabilityProviders::new()
//!     .with_llm_service(Arc::new(my_lookup), Arc::new(my_invoker))
//!     .with_classifier(Arc::new(my_classifier));
//! ```
//!
//! ## Built-in node types
//!
//! | Type | Capabilities | Routing |
//! |------|--------------|---------|
//! | `start` | - | single edge |
//! | `end` | - | terminates |
//! | `llm` | `llm_service` | single edge |
//! | `intent_extractor` | `intent_classifier` (optional) | single edge |
//! | `if_else` | - | `{id}-true` / `{id}-false` |
//! | `switch` | - | case outputs or default |
//! | `rest_api` | `rest_api_service`, `llm_service` | single edge |
//!
//! ## Modules
//!
//! - [`capabilities`] - Capability traits, providers and reference implementations
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM client implementations
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration
//! - [`workflows`] - Workflow definition, graph, nodes and engine

#![warn(rustdoc::missing_crate_level_docs)]

/// Capability traits and the providers that satisfy them.
pub mod capabilities;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Core types (entities, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;
/// Workflow engine and built-in nodes.
pub mod workflows;

// Re-export commonly used types
pub use capabilities::{Capabilities, CapabilityName, CapabilityProviders, CapabilityRequirement};
pub use llm::{LLMClient, Provider};
pub use types::{AppError, Result};
pub use utils::toml_config::AgentPlaneConfig;
pub use workflows::{
    Node, NodeRegistry, NodeSpec, RunState, WorkflowDefinition, WorkflowEngine, WorkflowOutput,
    WorkflowStep,
};
