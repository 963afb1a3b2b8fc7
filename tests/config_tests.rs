//! Configuration files on disk, from parsing to a wired-up engine.

use agentplane::utils::toml_config::{ConfigError, LogFormat};
use agentplane::workflows::{NodeRegistry, RunState, WorkflowDefinition, WorkflowEngine};
use agentplane::{AgentPlaneConfig, CapabilityProviders};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    std::env::set_var("AGENTPLANE_TEST_OPENAI_KEY", "sk-from-env");
    std::env::set_var("AGENTPLANE_TEST_CRM_TOKEN", "Bearer crm");

    let file = write_config(
        r#"
[logging]
level = "debug"
format = "json"

[engine]
max_steps = 200
run_timeout_secs = 30

[llms.writer]
name = "Writer"
model = "gpt-4o-mini"
hosting_environment = "openai"
api_key_env = "AGENTPLANE_TEST_OPENAI_KEY"
temperature = 0.3

[llms.foundry]
model = "gpt-4o"
hosting_environment = "azure"
api_endpoint = "https://foundry.example.com"
azure_deployment_name = "gpt4o-prod"
api_key_env = "AGENTPLANE_TEST_OPENAI_KEY"

[rest_apis.crm]
method = "post"
base_url = "https://crm.example.com"
resource_path = "/contacts/{contact_id}"
headers = { Accept = "application/json" }
auth_headers_env = { Authorization = "AGENTPLANE_TEST_CRM_TOKEN" }
query_params = { source = "agentplane" }

[classifier]
base_url = "http://localhost:8001"
"#,
    );

    let config = AgentPlaneConfig::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.engine.max_steps, 200);
    assert_eq!(config.engine.run_timeout_secs, Some(30));
    assert_eq!(config.classifier.as_ref().unwrap().timeout_secs, 30);

    let writer = config.llm_entity("writer").unwrap();
    assert_eq!(writer.name, "Writer");
    assert_eq!(writer.api_key.as_deref(), Some("sk-from-env"));
    assert_eq!(writer.temperature, Some(0.3));

    let foundry = config.llm_entity("foundry").unwrap();
    assert!(foundry.api_key.is_none());
    assert_eq!(foundry.azure_api_key.as_deref(), Some("sk-from-env"));
    assert_eq!(
        foundry.azure_endpoint_url.as_deref(),
        Some("https://foundry.example.com")
    );

    let crm = config.api_descriptor("crm").unwrap();
    assert_eq!(crm.method, "POST");
    assert_eq!(crm.auth_headers.get("Authorization").unwrap(), "Bearer crm");
    assert_eq!(crm.query_params.get("source"), Some(&json!("agentplane")));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = AgentPlaneConfig::load(dir.path().join("agentplane.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn test_invalid_toml() {
    let file = write_config("[engine\nmax_steps = ");
    let err = AgentPlaneConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_validation_failures() {
    let err = AgentPlaneConfig::parse(
        r#"
[llms.vertex]
model = "gemini"
hosting_environment = "gcp"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    assert!(err.to_string().contains("gcp"));

    let err = AgentPlaneConfig::parse(
        r#"
[llms.writer]
model = "gpt-4o"
hosting_environment = "openai"
api_key_env = "AGENTPLANE_TEST_DEFINITELY_UNSET"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "AGENTPLANE_TEST_DEFINITELY_UNSET"));

    let err = AgentPlaneConfig::parse("[engine]\nmax_steps = 0").unwrap_err();
    assert!(err.to_string().contains("max_steps"));

    let err = AgentPlaneConfig::parse(
        r#"
[rest_apis.bad]
method = "FETCH"
base_url = "http://x"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("FETCH"));
}

#[tokio::test]
async fn test_config_file_drives_a_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "configured answer"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = write_config(&format!(
        r#"
[engine]
max_steps = 10

[llms.local]
model = "llama3.2"
hosting_environment = "ollama"
api_endpoint = "{}"
"#,
        server.uri()
    ));
    let config = AgentPlaneConfig::load(file.path()).unwrap();

    let engine = WorkflowEngine::new(
        Arc::new(NodeRegistry::with_builtin_nodes()),
        Arc::new(CapabilityProviders::from_config(&config).unwrap()),
    )
    .with_config(config.engine.clone());

    let definition = WorkflowDefinition::from_value(json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "ask", "type": "llm", "config": {"llm_id": "local"}},
            {"id": "end", "type": "end"}
        ],
        "edges": [
            {"source": "start", "target": "ask"},
            {"source": "ask", "target": "end"}
        ]
    }))
    .unwrap();

    let state = engine
        .execute(&definition, RunState::from_prompt("hello"))
        .await
        .unwrap();
    assert_eq!(state.success, Some(true));
    assert_eq!(state.get_str("final_llm_response"), Some("configured answer"));
    assert_eq!(state.get("llm_metadata").unwrap()["hosting_environment"], "ollama");
}
