//! Subcommand implementations
//!
//! Each command reports progress through [`Output`] and returns `anyhow`
//! errors to `main`, which prints them and sets the exit code.

use super::output::Output;
use super::DEFAULT_CONFIG_FILE;
use crate::capabilities::CapabilityProviders;
use crate::utils::toml_config::AgentPlaneConfig;
use crate::workflows::{NodeRegistry, RunState, WorkflowDefinition, WorkflowEngine, WorkflowGraph};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Options for the `run` command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workflow: PathBuf,
    pub state: Option<PathBuf>,
    pub prompt: Option<String>,
    pub trace: bool,
    pub timeout_secs: Option<u64>,
}

/// Load the configuration file. A missing file at the default location falls
/// back to the built-in defaults; a missing explicit path is an error.
pub fn load_config(path: &Path) -> Result<AgentPlaneConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        tracing::debug!("No {} found; using default configuration", DEFAULT_CONFIG_FILE);
        return Ok(AgentPlaneConfig::default_config());
    }
    AgentPlaneConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Build the initial run state from an optional JSON file and prompt
pub fn initial_state(state_path: Option<&Path>, prompt: Option<&str>) -> Result<RunState> {
    let mut state = match state_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read state file {}", path.display()))?;
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("State file {} is not valid JSON", path.display()))?;
            anyhow::ensure!(
                value.is_object(),
                "State file {} must contain a JSON object",
                path.display()
            );
            RunState::from_value(value)?
        }
        None => RunState::new(),
    };

    if let Some(prompt) = prompt {
        state.insert("prompt", prompt);
    }
    Ok(state)
}

/// Run the `run` command
pub async fn run(
    options: RunOptions,
    config: &AgentPlaneConfig,
    output: &Output,
    cancel: CancellationToken,
) -> Result<()> {
    let definition = WorkflowDefinition::load(&options.workflow)?;
    let state = initial_state(options.state.as_deref(), options.prompt.as_deref())?;

    let providers = CapabilityProviders::from_config(config)?;
    let mut engine_config = config.engine.clone();
    if options.timeout_secs.is_some() {
        engine_config.run_timeout_secs = options.timeout_secs;
    }

    let engine = WorkflowEngine::new(
        Arc::new(NodeRegistry::with_builtin_nodes()),
        Arc::new(providers),
    )
    .with_config(engine_config);

    output.info(&format!(
        "Running {} ({} nodes, {} edges)",
        options.workflow.display(),
        definition.nodes.len(),
        definition.edges.len()
    ));
    let result = engine
        .execute_with_cancel(&definition, state, cancel)
        .await?;

    if options.trace {
        output.header("Trace");
        output.table_header(&["Node", "Type", "Handle", "Success"]);
        for step in &result.reasoning_path {
            let success = match step.success {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            };
            output.table_row(&[
                step.node_id.as_str(),
                step.node_type.as_str(),
                step.handle.as_deref().unwrap_or("-"),
                success,
            ]);
        }
    }

    output.json(&result.final_state.to_value())?;

    match result.final_state.success {
        Some(false) => output.warning(&format!(
            "Workflow finished after {} steps with a failure: {}",
            result.steps_executed,
            result.final_state.error.as_deref().unwrap_or("unknown error")
        )),
        _ => output.success(&format!(
            "Workflow finished after {} steps",
            result.steps_executed
        )),
    }
    Ok(())
}

/// Run the `validate` command
pub fn validate(workflow: &Path, output: &Output) -> Result<()> {
    let definition = WorkflowDefinition::load(workflow)?;
    let registry = NodeRegistry::with_builtin_nodes();
    let graph = WorkflowGraph::build(&definition, &registry)?;

    output.success(&format!("{} is a valid workflow", workflow.display()));
    output.kv("nodes", &definition.nodes.len().to_string());
    output.kv("edges", &definition.edges.len().to_string());
    output.kv("start", &graph.start().id);
    Ok(())
}

/// Run the `nodes` command
pub fn nodes(output: &Output) {
    let registry = NodeRegistry::with_builtin_nodes();

    output.header("Node types");
    output.table_header(&["Type", "Branching", "Capabilities"]);
    for (name, registration) in registry.iter() {
        let requirements = registration
            .requirements
            .iter()
            .map(|r| {
                if r.required {
                    r.name.to_string()
                } else {
                    format!("{} (optional)", r.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        output.table_row(&[
            name,
            if registration.outcomes.is_some() {
                "yes"
            } else {
                "no"
            },
            if requirements.is_empty() {
                "-"
            } else {
                requirements.as_str()
            },
        ]);
    }
}

/// Run the `config` command
pub fn config(config: &AgentPlaneConfig, path: &Path, validate: bool, output: &Output) -> Result<()> {
    if validate {
        config.validate()?;
        output.success(&format!("{} is valid", path.display()));
    }

    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv("log level", &config.logging.level);
    output.kv("log format", &format!("{:?}", config.logging.format).to_lowercase());
    output.kv("max steps", &config.engine.max_steps.to_string());
    output.kv(
        "run timeout",
        &config
            .engine
            .run_timeout_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string()),
    );
    output.kv(
        "classifier",
        config
            .classifier
            .as_ref()
            .map(|c| c.base_url.as_str())
            .unwrap_or("not configured"),
    );
    output.kv(
        "catalog",
        config
            .catalog
            .as_ref()
            .map(|c| c.base_url.as_str())
            .unwrap_or("static (this file)"),
    );

    output.subheader("Language models");
    if config.llms.is_empty() {
        output.hint("No [llms.*] entries");
    }
    for (id, llm) in &config.llms {
        output.list_item(&format!(
            "{}: {} on {}{}",
            id,
            llm.model,
            llm.hosting_environment,
            if llm.enabled { "" } else { " (disabled)" }
        ));
    }

    output.subheader("REST APIs");
    if config.rest_apis.is_empty() {
        output.hint("No [rest_apis.*] entries");
    }
    for (id, api) in &config.rest_apis {
        output.list_item(&format!(
            "{}: {} {}{}{}",
            id,
            api.method.to_uppercase(),
            api.base_url,
            api.resource_path.as_deref().unwrap_or(""),
            if api.enabled { "" } else { " (disabled)" }
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_initial_state_from_file_and_prompt() {
        let file = json_file(r#"{"amount": 5, "success": true}"#);
        let state = initial_state(Some(file.path()), Some("hello")).unwrap();

        assert_eq!(state.get("amount"), Some(&serde_json::json!(5)));
        assert_eq!(state.get_str("prompt"), Some("hello"));
        assert_eq!(state.success, Some(true));
    }

    #[test]
    fn test_initial_state_rejects_non_object() {
        let file = json_file("[1, 2]");
        assert!(initial_state(Some(file.path()), None).is_err());
    }

    #[test]
    fn test_missing_default_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
        // relative default path resolved against the test's working directory
        if !Path::new(DEFAULT_CONFIG_FILE).exists() {
            let config = load_config(Path::new(DEFAULT_CONFIG_FILE)).unwrap();
            assert!(config.llms.is_empty());
        }
    }

    #[test]
    fn test_validate_workflow_file() {
        let good = json_file(
            r#"{"nodes": [{"id": "s", "type": "start"}, {"id": "e", "type": "end"}],
                "edges": [{"source": "s", "target": "e"}]}"#,
        );
        assert!(validate(good.path(), &Output::no_color()).is_ok());

        let bad = json_file(r#"{"nodes": [{"id": "e", "type": "end"}], "edges": []}"#);
        assert!(validate(bad.path(), &Output::no_color()).is_err());
    }

    #[tokio::test]
    async fn test_run_start_to_end() {
        let workflow = json_file(
            r#"{"nodes": [{"id": "s", "type": "start"}, {"id": "e", "type": "end", "config": {"output_field": "prompt"}}],
                "edges": [{"source": "s", "target": "e"}]}"#,
        );
        let options = RunOptions {
            workflow: workflow.path().to_path_buf(),
            state: None,
            prompt: Some("ping".to_string()),
            trace: true,
            timeout_secs: Some(5),
        };

        run(
            options,
            &AgentPlaneConfig::default_config(),
            &Output::no_color(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    }
}
