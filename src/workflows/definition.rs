//! Workflow definition schema: `{nodes: [...], edges: [...]}` as authored in
//! the graph editor and stored as JSON.

use crate::types::{null_as_default, AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<EdgeDefinition>,
}

impl WorkflowDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AppError::Configuration(format!("Invalid workflow definition: {}", e)))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Configuration(format!("Invalid workflow definition: {}", e)))
    }

    /// Read a definition from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read workflow file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn node(&self, id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: Map<String, Value>,
    /// Entity reference stored at the node root by the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Intelligence LLM reference stored at the node root by the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intel_link: Option<String>,
}

impl NodeDefinition {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: Map::new(),
            link: None,
            intel_link: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        if let Value::Object(map) = config {
            self.config = map;
        }
        self
    }

    /// Config with root-level `link` / `intel_link` merged in. Keys already in
    /// `config` win.
    pub fn effective_config(&self) -> Map<String, Value> {
        let mut config = self.config.clone();
        for (key, value) in [("link", &self.link), ("intel_link", &self.intel_link)] {
            if let Some(v) = value {
                config
                    .entry(key.to_string())
                    .or_insert_with(|| Value::String(v.clone()));
            }
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub source: String,
    #[serde(
        default,
        rename = "sourceHandle",
        alias = "source_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    pub target: String,
}

impl EdgeDefinition {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_handle: None,
            target: target.into(),
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// The source handle, with an empty string treated as absent
    pub fn handle(&self) -> Option<&str> {
        self.source_handle.as_deref().filter(|h| !h.is_empty())
    }
}
