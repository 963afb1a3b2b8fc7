//! `rest_api` node against a local HTTP server.

mod common;

use agentplane::workflows::{NodeRegistry, RunState, WorkflowDefinition, WorkflowEngine};
use agentplane::{AppError, CapabilityProviders};
use common::mocks::{api_descriptor, llm_entity, MockApis, MockLanguageModels};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GET_PLAN: &str = r#"{
    "path_params": {"user_id": "42"},
    "query_params": {"expand": "orders"},
    "headers": {"X-Trace": "t1"},
    "body_data": null
}"#;

fn flow(api_id: &str, retry_count: u64) -> WorkflowDefinition {
    WorkflowDefinition::from_value(json!({
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "call", "type": "rest_api", "config": {
                "link": api_id,
                "intel_link": "planner",
                "retry_count": retry_count,
                "retry_backoff_ms": 0,
                "timeout": 5
            }},
            {"id": "end", "type": "end", "config": {"output_field": "response"}}
        ],
        "edges": [
            {"source": "start", "target": "call"},
            {"source": "call", "target": "end"}
        ]
    }))
    .unwrap()
}

fn engine(models: Arc<MockLanguageModels>, apis: MockApis) -> WorkflowEngine {
    let providers = CapabilityProviders::new()
        .with_llm_service(models.clone(), models)
        .with_api_lookup(Arc::new(apis));
    WorkflowEngine::new(
        Arc::new(NodeRegistry::with_builtin_nodes()),
        Arc::new(providers),
    )
}

fn planner(plan: &str) -> Arc<MockLanguageModels> {
    Arc::new(MockLanguageModels::replying(plan).with_entity(llm_entity("planner")))
}

fn users_api(server: &MockServer) -> MockApis {
    MockApis::default().with_api(api_descriptor("users", "GET", &server.uri(), "/users/{user_id}"))
}

fn http_response(state: &RunState) -> &Value {
    state.get("http_response").expect("http_response recorded")
}

#[tokio::test]
async fn test_get_with_planned_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(query_param("expand", "orders"))
        .and(header("X-Trace", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let models = planner(GET_PLAN);
    let mut input = RunState::from_prompt("look up user 42");
    input.insert("user_id", 42);

    let state = engine(models.clone(), users_api(&server))
        .execute(&flow("users", 3), input)
        .await
        .unwrap();

    assert_eq!(state.success, Some(true));
    assert_eq!(state.get("status_code"), Some(&json!(200)));
    assert_eq!(state.get("final_llm_response"), Some(&json!({"name": "Ada"})));
    assert_eq!(http_response(&state)["attempts"], 1);
    assert_eq!(http_response(&state)["method"], "GET");

    let prompt = &models.invocations()[0].prompt;
    assert!(prompt.contains("Current Workflow State"));
    assert!(prompt.contains("look up user 42"));
}

#[tokio::test]
async fn test_server_errors_are_retried_until_budget_is_spent() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let state = engine(planner(GET_PLAN), users_api(&server))
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert_eq!(state.get("status_code"), Some(&json!(503)));
    assert_eq!(http_response(&state)["attempts"], 4);
    assert!(state.error.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "no such user"})))
        .expect(1)
        .mount(&server)
        .await;

    let state = engine(planner(GET_PLAN), users_api(&server))
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert_eq!(state.get("status_code"), Some(&json!(404)));
    assert_eq!(state.get("response"), Some(&json!({"detail": "no such user"})));
    assert_eq!(http_response(&state)["attempts"], 1);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&server)
        .await;

    let state = engine(planner(GET_PLAN), users_api(&server))
        .execute(&flow("users", 2), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(true));
    assert_eq!(state.get("response"), Some(&json!("plain text")));
    assert_eq!(http_response(&state)["attempts"], 2);
}

#[tokio::test]
async fn test_post_sends_planned_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/refunds"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"order_id": "A-1", "amount": 10})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"refund_id": "r-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let plan = r#"```json
{"path_params": {}, "query_params": null, "headers": {}, "body_data": {"order_id": "A-1", "amount": 10}}
```"#;
    let apis = MockApis::default().with_api(api_descriptor(
        "refunds",
        "post",
        &server.uri(),
        "/refunds",
    ));

    let state = engine(planner(plan), apis)
        .execute(&flow("refunds", 0), RunState::from_prompt("refund A-1"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(true));
    assert_eq!(state.get("status_code"), Some(&json!(201)));
    assert_eq!(state.get("final_llm_response"), Some(&json!({"refund_id": "r-9"})));
}

#[tokio::test]
async fn test_unparseable_plan_skips_the_call() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = engine(planner("Sure! Here is the request you asked for."), users_api(&server))
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert_eq!(state.get("status_code"), Some(&json!(0)));
    assert_eq!(state.get("response"), Some(&Value::Null));
    assert!(state.error.as_deref().unwrap().contains("invalid JSON"));
}

#[tokio::test]
async fn test_unknown_api_is_a_soft_failure() {
    let state = engine(planner(GET_PLAN), MockApis::default())
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert!(state.error.as_deref().unwrap().contains("REST API with ID users not found"));
}

#[tokio::test]
async fn test_unreachable_host_records_status_zero() {
    let apis = MockApis::default().with_api(api_descriptor(
        "users",
        "GET",
        "http://127.0.0.1:1",
        "/users/{user_id}",
    ));

    let state = engine(planner(GET_PLAN), apis)
        .execute(&flow("users", 1), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert_eq!(state.get("status_code"), Some(&json!(0)));
    assert_eq!(http_response(&state)["attempts"], 2);
    assert!(http_response(&state)["error"].is_string());
}

#[tokio::test]
async fn test_missing_intelligence_llm_aborts_run() {
    let server = MockServer::start().await;
    let models = Arc::new(MockLanguageModels::replying(GET_PLAN));

    let err = engine(models, users_api(&server))
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Capability(_)));
    assert!(err.to_string().contains("planner"));
}

#[tokio::test]
async fn test_invalid_method_fails_the_node_without_sending() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let models = planner(GET_PLAN);
    let apis = MockApis::default().with_api(api_descriptor(
        "users",
        "FETCH",
        &server.uri(),
        "/users/{user_id}",
    ));

    let state = engine(models.clone(), apis)
        .execute(&flow("users", 3), RunState::from_prompt("x"))
        .await
        .unwrap();

    assert_eq!(state.success, Some(false));
    assert_eq!(state.get("status_code"), Some(&json!(0)));
    assert!(state.error.as_deref().unwrap().contains("invalid HTTP method 'FETCH'"));
    assert!(models.invocations().is_empty());
}
