//! Workflow Engine Module
//!
//! Executes workflow graphs produced by a visual builder: a set of typed
//! nodes joined by edges, walked from the single `start` node while a
//! [`RunState`] flows through every visited node.
//!
//! # Definition format
//!
//! ```json
//! {
//!   "nodes": [
//!     {"id": "start", "type": "start"},
//!     {"id": "check", "type": "if_else", "config": {
//!       "condition_field": "amount",
//!       "condition_operator": "greater_than",
//!       "condition_value": "100"
//!     }},
//!     {"id": "big", "type": "end"},
//!     {"id": "small", "type": "end"}
//!   ],
//!   "edges": [
//!     {"source": "start", "target": "check"},
//!     {"source": "check", "sourceHandle": "check-true", "target": "big"},
//!     {"source": "check", "sourceHandle": "check-false", "target": "small"}
//!   ]
//! }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = WorkflowEngine::new(
//!     Arc::new(NodeRegistry::with_builtin_nodes()),
//!     Arc::new(CapabilityProviders::from_config(&config)?),
//! );
//! let definition = WorkflowDefinition::load("workflow.json")?;
//! let state = engine.execute(&definition, RunState::from_prompt("hello")).await?;
//! println!("{:?}", state.get("final_llm_response"));
//! ```

pub mod definition;
pub mod engine;
pub mod graph;
pub mod nodes;
pub mod operators;
pub mod registry;
pub mod state;

pub use definition::{EdgeDefinition, NodeDefinition, WorkflowDefinition};
pub use engine::{WorkflowEngine, WorkflowOutput, WorkflowStep};
pub use graph::WorkflowGraph;
pub use nodes::{Node, NodeSpec, Route};
pub use operators::Operator;
pub use registry::{NodeRegistration, NodeRegistry};
pub use state::RunState;
