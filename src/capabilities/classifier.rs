use super::Classifier;
use crate::types::{AppError, Classification, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    labels: &'a [String],
}

/// Client for the zero-shot intent classification service (`POST {base}/classify`)
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Classification> {
        let url = format!("{}/classify", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-Service", "AgentPlane")
            .json(&ClassifyRequest { text, labels })
            .send()
            .await
            .map_err(|e| AppError::Classifier(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Classifier(format!(
                "Classifier returned {}: {}",
                status, body
            )));
        }

        let classification = response
            .json::<Classification>()
            .await
            .map_err(|e| AppError::Classifier(format!("Invalid classifier response: {}", e)))?;

        tracing::debug!(
            intent = %classification.intent,
            confidence = classification.confidence,
            "Classified input"
        );
        Ok(classification)
    }
}
