//! HTTP transport for the `rest_api` node: bounded retries with backoff.

use super::request::PreparedRequest;
use crate::types::{AppError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Retry budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Delay before the first retry; 0 retries immediately
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 3,
            backoff_ms: 250,
            max_backoff_ms: 5000,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Delay after the given failed attempt (1-based): exponential, capped,
    /// with 0.8x to 1.2x jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.backoff_ms == 0 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(30);
        let ms = self
            .backoff_ms
            .saturating_mul(2u64.pow(exp))
            .min(self.max_backoff_ms);
        let jitter = 0.8 + rand::random::<f64>() * 0.4;
        Duration::from_millis((ms as f64 * jitter) as u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Connect timeout; the whole request may take twice as long
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of a call, stored verbatim as `http_response` in run state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponseRecord {
    /// 0 when no response was received
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub data: Value,
    pub url: String,
    pub method: String,
    pub success: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpResponseRecord {
    fn transport_failure(request: &PreparedRequest, attempts: u32, error: String) -> Self {
        Self {
            status_code: 0,
            headers: BTreeMap::new(),
            data: Value::Null,
            url: request.url.clone(),
            method: request.method.to_string(),
            success: false,
            attempts,
            error: Some(error),
        }
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout * 2)
            .redirect(redirect)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// Send with retries on 5xx and transport failures. Never fails: the last
    /// response, or a `status_code = 0` record, is returned once the budget is spent.
    pub async fn send_with_retry(&self, request: &PreparedRequest) -> HttpResponseRecord {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            tracing::info!(
                method = %request.method,
                url = %request.url,
                attempt,
                max_attempts,
                "Sending REST API request"
            );

            let retryable = match self.send_once(request, attempt).await {
                Ok(record) if record.status_code < 500 => return record,
                Ok(record) => {
                    if attempt >= max_attempts {
                        return record;
                    }
                    format!("server error {}", record.status_code)
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        return HttpResponseRecord::transport_failure(
                            request,
                            attempt,
                            e.to_string(),
                        );
                    }
                    e.to_string()
                }
            };

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                attempt,
                backoff_ms = delay.as_millis() as u64,
                reason = %retryable,
                "Retrying REST API request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        request: &PreparedRequest,
        attempt: u32,
    ) -> std::result::Result<HttpResponseRecord, reqwest::Error> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let data = match response.text().await {
            Ok(text) if text.is_empty() => Value::Null,
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read response body");
                Value::Null
            }
        };

        tracing::debug!(status = status.as_u16(), url = %url, "REST API response");

        Ok(HttpResponseRecord {
            status_code: status.as_u16(),
            headers,
            data,
            url,
            method: request.method.to_string(),
            success: status.is_success(),
            attempts: attempt,
            error: None,
        })
    }
}
