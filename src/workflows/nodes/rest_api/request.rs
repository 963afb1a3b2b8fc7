//! Turning an API descriptor plus an LLM-produced plan into a concrete request.

use crate::types::{null_as_default, ApiDescriptor, AppError, Result};
use crate::workflows::operators::stringify;
use crate::workflows::state::RunState;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `{name}` or `:name` in a resource path
static PATH_PARAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}|:(\w+)").expect("path parameter pattern is valid"));

/// Request components chosen by the intelligence LLM
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_params: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_params: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub body_data: Option<Value>,
}

impl RequestPlan {
    /// Parse the LLM's answer. Markdown code fences around the JSON are tolerated.
    pub fn parse(response: &str) -> Result<Self> {
        let json = strip_code_fences(response);
        let value: Value = serde_json::from_str(json).map_err(|e| {
            AppError::InvalidInput(format!("LLM returned invalid JSON response: {}", e))
        })?;
        if !value.is_object() {
            return Err(AppError::InvalidInput(
                "LLM response is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| {
            AppError::InvalidInput(format!("LLM response has an unexpected shape: {}", e))
        })
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) up to the first newline
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Prompt asking the intelligence LLM to map run state onto the API
pub fn build_prompt(api: &ApiDescriptor, state: &RunState) -> String {
    let state_json =
        serde_json::to_string_pretty(state).unwrap_or_else(|_| state.to_value().to_string());

    format!(
        r#"You are helping to build an HTTP request for a REST API call. Here's the context:

API Details:
- Method: {method}
- URL: {url}
- Description: {description}

Current Workflow State:
{state_json}

Instructions:
1. Analyze the workflow state and extract relevant data for the API call
2. Map the data to appropriate request components (path parameters, query parameters, headers, body)
3. Return ONLY a valid JSON object with these keys: "path_params", "query_params", "headers", "body_data"
4. Ensure all values are properly formatted for HTTP requests
5. If a parameter is not needed, set it to null or empty object

Example response format:
{{
    "path_params": {{"id": "123"}},
    "query_params": {{"limit": 10, "filter": "active"}},
    "headers": {{"Content-Type": "application/json"}},
    "body_data": {{"name": "example", "value": "test"}}
}}
"#,
        method = api.method_upper(),
        url = api.endpoint_url(),
        description = api
            .description
            .as_deref()
            .unwrap_or("No description available"),
    )
}

/// A fully resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl PreparedRequest {
    pub fn build(api: &ApiDescriptor, plan: &RequestPlan) -> Result<Self> {
        Ok(Self {
            method: api.http_method()?,
            url: build_url(api, &plan.path_params),
            headers: build_headers(api, &plan.headers),
            query: build_query(api, &plan.query_params),
            body: build_body(api, plan.body_data.as_ref()),
        })
    }
}

fn build_url(api: &ApiDescriptor, path_params: &Map<String, Value>) -> String {
    let base = api.base_url.trim_end_matches('/');
    let template = api
        .resource_path
        .as_deref()
        .unwrap_or_default()
        .trim_start_matches('/');

    // unknown placeholders are left in place
    let resource = PATH_PARAM_PATTERN.replace_all(template, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        match path_params.get(name) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        }
    });

    if resource.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, resource)
    }
}

fn build_headers(api: &ApiDescriptor, extra: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut headers = api.headers.clone();
    headers.extend(
        api.auth_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    headers.extend(extra.iter().map(|(k, v)| (k.clone(), stringify(v))));

    let has_content_type = headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("content-type"));
    if api.sends_body() && !has_content_type {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    headers
}

fn build_query(api: &ApiDescriptor, extra: &Map<String, Value>) -> Vec<(String, String)> {
    let mut params = api.query_params.clone();
    for (k, v) in extra {
        params.insert(k.clone(), v.clone());
    }
    params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect()
}

fn build_body(api: &ApiDescriptor, body: Option<&Value>) -> Option<String> {
    if !api.sends_body() {
        return None;
    }
    match body? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
