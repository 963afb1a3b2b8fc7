//! Node type registry: type name → factory + declared capability requirements

use crate::capabilities::{Capabilities, CapabilityName, CapabilityRequirement};
use crate::types::{AppError, Result};
use crate::workflows::nodes::{
    EndNode, IfElseNode, IntentExtractorNode, LlmPromptNode, Node, NodeSpec, RestApiNode, Route,
    StartNode, SwitchNode,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a node instance for one visit
pub type NodeFactory = Arc<dyn Fn(NodeSpec, Capabilities) -> Result<Box<dyn Node>> + Send + Sync>;

/// Lists the routing outcomes a node can produce, for edge coverage checks
pub type OutcomesFn = Arc<dyn Fn(&NodeSpec) -> Vec<Route> + Send + Sync>;

#[derive(Clone)]
pub struct NodeRegistration {
    pub factory: NodeFactory,
    pub requirements: Vec<CapabilityRequirement>,
    pub outcomes: Option<OutcomesFn>,
}

impl fmt::Debug for NodeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistration")
            .field("requirements", &self.requirements)
            .field("branching", &self.outcomes.is_some())
            .finish()
    }
}

/// Registry for node types
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeRegistration>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in node types
    pub fn with_builtin_nodes() -> Self {
        use CapabilityName::*;

        let mut registry = Self::new();
        registry.register("start", StartNode::create, vec![]);
        registry.register("end", EndNode::create, vec![]);
        registry.register(
            "llm",
            LlmPromptNode::create,
            vec![CapabilityRequirement::required(LlmService)],
        );
        registry.register(
            "intent_extractor",
            IntentExtractorNode::create,
            vec![CapabilityRequirement::optional(IntentClassifier)],
        );
        registry.register_branching("if_else", IfElseNode::create, vec![], IfElseNode::outcomes);
        registry.register_branching("switch", SwitchNode::create, vec![], SwitchNode::outcomes);
        registry.register(
            "rest_api",
            RestApiNode::create,
            vec![
                CapabilityRequirement::required(RestApiService),
                CapabilityRequirement::required(LlmService),
            ],
        );
        registry
    }

    /// Register a node type, replacing any previous registration
    pub fn register<F>(
        &mut self,
        type_name: impl Into<String>,
        factory: F,
        requirements: Vec<CapabilityRequirement>,
    ) where
        F: Fn(NodeSpec, Capabilities) -> Result<Box<dyn Node>> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Arc::new(factory), requirements, None);
    }

    /// Register a node type whose routing outcomes can be listed up front
    pub fn register_branching<F, O>(
        &mut self,
        type_name: impl Into<String>,
        factory: F,
        requirements: Vec<CapabilityRequirement>,
        outcomes: O,
    ) where
        F: Fn(NodeSpec, Capabilities) -> Result<Box<dyn Node>> + Send + Sync + 'static,
        O: Fn(&NodeSpec) -> Vec<Route> + Send + Sync + 'static,
    {
        self.insert(
            type_name.into(),
            Arc::new(factory),
            requirements,
            Some(Arc::new(outcomes)),
        );
    }

    fn insert(
        &mut self,
        type_name: String,
        factory: NodeFactory,
        requirements: Vec<CapabilityRequirement>,
        outcomes: Option<OutcomesFn>,
    ) {
        if self.nodes.contains_key(&type_name) {
            tracing::warn!(node_type = %type_name, "Replacing registered node type");
        }
        self.nodes.insert(
            type_name,
            NodeRegistration {
                factory,
                requirements,
                outcomes,
            },
        );
    }

    /// Look up a node type
    pub fn resolve(&self, type_name: &str) -> Result<&NodeRegistration> {
        self.nodes.get(type_name).ok_or_else(|| {
            AppError::Configuration(format!("Unknown node type: '{}'", type_name))
        })
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.nodes.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeRegistration)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
