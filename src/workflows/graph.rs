//! Validated, indexed view of a workflow definition

use crate::types::{AppError, Result};
use crate::workflows::definition::{EdgeDefinition, NodeDefinition, WorkflowDefinition};
use crate::workflows::nodes::NodeSpec;
use crate::workflows::registry::NodeRegistry;
use std::collections::{HashMap, HashSet};

/// A definition that passed graph-build checks
#[derive(Debug)]
pub struct WorkflowGraph<'a> {
    start: &'a NodeDefinition,
    nodes: HashMap<&'a str, &'a NodeDefinition>,
    outgoing: HashMap<&'a str, Vec<&'a EdgeDefinition>>,
}

impl<'a> WorkflowGraph<'a> {
    /// Check the definition against the registry. Nothing is instantiated and
    /// no capability is touched.
    pub fn build(definition: &'a WorkflowDefinition, registry: &NodeRegistry) -> Result<Self> {
        if definition.nodes.is_empty() {
            return Err(AppError::Configuration(
                "Workflow definition must contain 'nodes'".to_string(),
            ));
        }
        if definition.edges.is_empty() {
            return Err(AppError::Configuration(
                "Workflow definition must contain 'edges'".to_string(),
            ));
        }

        let mut nodes = HashMap::with_capacity(definition.nodes.len());
        for node in &definition.nodes {
            if node.id.trim().is_empty() {
                return Err(AppError::Configuration(
                    "Workflow node with empty id".to_string(),
                ));
            }
            if nodes.insert(node.id.as_str(), node).is_some() {
                return Err(AppError::Configuration(format!(
                    "Duplicate node id '{}'",
                    node.id
                )));
            }
            registry.resolve(&node.node_type).map_err(|_| {
                AppError::Configuration(format!(
                    "Unknown node type '{}' for node '{}'",
                    node.node_type, node.id
                ))
            })?;
        }

        let starts: Vec<&NodeDefinition> = definition
            .nodes
            .iter()
            .filter(|n| n.node_type == "start")
            .collect();
        let start = match starts.as_slice() {
            [] => {
                return Err(AppError::Configuration(
                    "No start node found in workflow".to_string(),
                ))
            }
            [start] => *start,
            many => {
                return Err(AppError::Configuration(format!(
                    "Workflow has {} start nodes; exactly one is allowed",
                    many.len()
                )))
            }
        };

        let mut outgoing: HashMap<&str, Vec<&EdgeDefinition>> = HashMap::new();
        for edge in &definition.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !nodes.contains_key(endpoint.as_str()) {
                    return Err(AppError::Configuration(format!(
                        "Edge {} -> {} references unknown node '{}'",
                        edge.source, edge.target, endpoint
                    )));
                }
            }
            outgoing.entry(edge.source.as_str()).or_default().push(edge);
        }

        let graph = Self {
            start,
            nodes,
            outgoing,
        };
        graph.warn_uncovered_outcomes(definition, registry);
        Ok(graph)
    }

    pub fn start(&self) -> &'a NodeDefinition {
        self.start
    }

    pub fn node(&self, id: &str) -> Option<&'a NodeDefinition> {
        self.nodes.get(id).copied()
    }

    /// Edge to follow from `node_id` given the node's routing handle
    ///
    /// With a handle, the first edge whose handle matches it; without, the
    /// first edge that carries no handle.
    pub fn next_edge(&self, node_id: &str, handle: Option<&str>) -> Option<&'a EdgeDefinition> {
        let edges = self.outgoing.get(node_id)?;
        match handle {
            Some(h) => edges
                .iter()
                .find(|e| e.handle().is_some_and(|eh| handle_matches(eh, h, node_id)))
                .copied(),
            None => edges.iter().find(|e| e.handle().is_none()).copied(),
        }
    }

    fn warn_uncovered_outcomes(&self, definition: &WorkflowDefinition, registry: &NodeRegistry) {
        for node in &definition.nodes {
            let Some(outcomes) = registry
                .resolve(&node.node_type)
                .ok()
                .and_then(|r| r.outcomes.clone())
            else {
                continue;
            };

            let spec = NodeSpec::from_definition(node);
            let mut seen = HashSet::new();
            for route in outcomes(&spec) {
                let Some(handle) = route.handle(&node.id) else {
                    continue;
                };
                if !seen.insert(handle.clone()) {
                    continue;
                }
                if self.next_edge(&node.id, Some(&handle)).is_none() {
                    tracing::warn!(
                        node_id = %node.id,
                        node_type = %node.node_type,
                        handle = %handle,
                        "Routing outcome has no matching edge; the run will stop there"
                    );
                }
            }
        }
    }
}

/// Edge handle `edge` matches node handle `handle` exactly or with the
/// `{node_id}-` prefix added or removed on either side
pub fn handle_matches(edge: &str, handle: &str, node_id: &str) -> bool {
    if edge == handle {
        return true;
    }
    let prefix = format!("{}-", node_id);
    let bare_edge = edge.strip_prefix(&prefix).unwrap_or(edge);
    let bare_handle = handle.strip_prefix(&prefix).unwrap_or(handle);
    bare_edge == bare_handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(value: serde_json::Value) -> WorkflowDefinition {
        WorkflowDefinition::from_value(value).unwrap()
    }

    fn build_err(value: serde_json::Value) -> String {
        let def = definition(value);
        WorkflowGraph::build(&def, &NodeRegistry::with_builtin_nodes())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_handle_matching() {
        assert!(handle_matches("cond-true", "cond-true", "cond"));
        assert!(handle_matches("true", "cond-true", "cond"));
        assert!(handle_matches("cond-path_ok", "path_ok", "cond"));
        assert!(!handle_matches("false", "cond-true", "cond"));
        assert!(!handle_matches("other-true", "cond-true", "cond"));
    }

    #[test]
    fn test_build_rejects_malformed_definitions() {
        assert!(build_err(json!({"nodes": [], "edges": []})).contains("'nodes'"));
        assert!(build_err(json!({
            "nodes": [{"id": "s", "type": "start"}],
            "edges": []
        }))
        .contains("'edges'"));
        assert!(build_err(json!({
            "nodes": [{"id": "e", "type": "end"}],
            "edges": [{"source": "e", "target": "e"}]
        }))
        .contains("No start node"));
        assert!(build_err(json!({
            "nodes": [{"id": "a", "type": "start"}, {"id": "b", "type": "start"}],
            "edges": [{"source": "a", "target": "b"}]
        }))
        .contains("2 start nodes"));
        assert!(build_err(json!({
            "nodes": [{"id": "a", "type": "start"}, {"id": "a", "type": "end"}],
            "edges": [{"source": "a", "target": "a"}]
        }))
        .contains("Duplicate node id"));
        assert!(build_err(json!({
            "nodes": [{"id": "a", "type": "start"}],
            "edges": [{"source": "a", "target": "ghost"}]
        }))
        .contains("unknown node 'ghost'"));
        assert!(build_err(json!({
            "nodes": [{"id": "a", "type": "start"}, {"id": "t", "type": "teleport"}],
            "edges": [{"source": "a", "target": "t"}]
        }))
        .contains("Unknown node type 'teleport'"));
    }

    #[test]
    fn test_next_edge() {
        let def = definition(json!({
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "c", "type": "if_else"},
                {"id": "yes", "type": "end"},
                {"id": "no", "type": "end"}
            ],
            "edges": [
                {"source": "s", "target": "c"},
                {"source": "c", "target": "yes", "sourceHandle": "true"},
                {"source": "c", "target": "no", "sourceHandle": "c-false"}
            ]
        }));
        let graph = WorkflowGraph::build(&def, &NodeRegistry::with_builtin_nodes()).unwrap();

        assert_eq!(graph.start().id, "s");
        assert_eq!(graph.next_edge("s", None).unwrap().target, "c");
        assert_eq!(graph.next_edge("c", Some("c-true")).unwrap().target, "yes");
        assert_eq!(graph.next_edge("c", Some("c-false")).unwrap().target, "no");
        assert!(graph.next_edge("c", None).is_none());
        assert!(graph.next_edge("yes", None).is_none());
    }
}
