use super::{Node, NodeSpec};
use crate::capabilities::{Capabilities, Classifier};
use crate::types::{AppError, Classification, Result};
use crate::workflows::state::RunState;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const DEFAULT_INTENTS: [&str; 4] = [
    "agent_creation",
    "information_request",
    "support_request",
    "general_inquiry",
];

/// Classifies the user's input against a set of expected intents
pub struct IntentExtractorNode {
    id: String,
    classifier: Option<Arc<dyn Classifier>>,
    labels: Vec<String>,
}

impl IntentExtractorNode {
    pub fn create(spec: NodeSpec, caps: Capabilities) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            classifier: caps.classifier().cloned(),
            labels: Self::expected_intents(&spec),
            id: spec.id,
        }))
    }

    /// `advanced_config.intents_expected`, then `intents_expected`, then the defaults
    fn expected_intents(spec: &NodeSpec) -> Vec<String> {
        let configured = spec
            .value("advanced_config")
            .and_then(|adv| adv.get("intents_expected"))
            .or_else(|| spec.value("intents_expected"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if configured.is_empty() {
            DEFAULT_INTENTS.iter().map(|s| s.to_string()).collect()
        } else {
            configured
        }
    }

    async fn classify(&self, text: &str) -> Result<Classification> {
        let classifier = self.classifier.as_ref().ok_or_else(|| {
            AppError::Classifier("intent classifier capability not provided".to_string())
        })?;
        classifier.classify(text, &self.labels).await
    }
}

#[async_trait]
impl Node for IntentExtractorNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "intent_extractor"
    }

    async fn process(&mut self, mut state: RunState) -> Result<RunState> {
        let input = match state.first_str(&["user_input", "prompt", "message"]) {
            Some(text) => text.to_string(),
            None => {
                let message = "No user input found in state for intent extraction";
                tracing::warn!(node_id = %self.id, "{}", message);
                state.insert("intent_extraction_response", message);
                state.fail(message);
                return Ok(state);
            }
        };

        match self.classify(&input).await {
            Ok(result) => {
                let confidence = normalize_confidence(result.confidence);
                tracing::info!(
                    node_id = %self.id,
                    intent = %result.intent,
                    confidence,
                    "Intent extracted"
                );

                let all_confidences: Map<String, Value> = result
                    .all_labels
                    .iter()
                    .zip(result.all_scores.iter())
                    .map(|(label, score)| (label.clone(), json!(score)))
                    .collect();

                state.insert(
                    "intent_extraction_response",
                    json!({
                        "intent": result.intent,
                        "confidence": confidence,
                        "all_labels": result.all_labels,
                        "all_scores": result.all_scores,
                        "original_text": input,
                    }),
                );
                state.insert("extracted_intent", result.intent.clone());
                state.insert("intent_confidence", confidence);
                state.insert("original_user_input", input);
                state.insert(
                    "intent_extraction_metadata",
                    json!({
                        "service": "intent_classifier",
                        "expected_intents": self.labels,
                        "node_type": "intent_extractor",
                        "classification_method": "zero_shot",
                        "top_confidence": confidence,
                        "all_confidences": all_confidences,
                    }),
                );
                state.mark_success();
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::error!(node_id = %self.id, error = %e, "Intent extraction failed");
                state.insert(
                    "intent_extraction_response",
                    format!("Failed to extract intent: {}", e),
                );
                state.insert("extracted_intent", "error");
                state.insert("intent_confidence", 0.0);
                state.insert(
                    "intent_extraction_metadata",
                    json!({
                        "error": e.to_string(),
                        "service": "intent_classifier",
                        "node_type": "intent_extractor",
                    }),
                );
                state.fail(e.to_string());
            }
        }

        Ok(state)
    }
}

/// Clamp to [0, 1]; NaN and infinities count as no confidence.
fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
