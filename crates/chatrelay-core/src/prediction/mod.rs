//! Asynchronous prediction API.
//!
//! A prediction is created with a webhook URL; the provider answers the
//! create call immediately (status `starting`) and later POSTs the finished
//! prediction object to the webhook. The same [`Prediction`] shape is used for
//! both the create response and the webhook body.
//!
//! [`PredictionClient`] is the seam between the HTTP relay and the provider;
//! [`ReplicateClient`] is the production implementation.

mod replicate;

pub use replicate::{DEFAULT_API_BASE, ReplicateClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Only deliver the terminal event to the webhook.
pub const WEBHOOK_EVENT_COMPLETED: &str = "completed";

/// Errors returned while submitting a prediction.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Transport failure (connect, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// No API token is configured, so nothing can be submitted.
    #[error("no inference API token configured")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub prompt: String,
}

/// Body of `POST /v1/predictions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Model version identifier.
    pub version: String,
    pub input: PredictionInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_events_filter: Vec<String>,
}

impl PredictionRequest {
    /// Request whose result is delivered once, on completion, to `webhook`.
    pub fn with_completion_webhook(
        version: impl Into<String>,
        prompt: impl Into<String>,
        webhook: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            input: PredictionInput { prompt: prompt.into() },
            webhook: Some(webhook.into()),
            webhook_events_filter: vec![WEBHOOK_EVENT_COMPLETED.to_owned()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    /// No further webhook will follow a prediction in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

/// Model output: language models stream tokens, so the finished output is
/// usually a list of fragments; some models return one string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Fragments(Vec<String>),
    Text(String),
}

impl PredictionOutput {
    pub fn joined(&self) -> String {
        match self {
            PredictionOutput::Fragments(parts) => parts.concat(),
            PredictionOutput::Text(text) => text.clone(),
        }
    }
}

/// A prediction object as returned by the create call and posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<PredictionOutput>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Webhook bodies are complete prediction objects.
pub type WebhookPayload = Prediction;

impl Prediction {
    pub fn succeeded(&self) -> bool {
        self.status == PredictionStatus::Succeeded
    }

    /// Concatenated output of a successful prediction; `None` for any other
    /// status. A success without output yields an empty string.
    pub fn completion_text(&self) -> Option<String> {
        if !self.succeeded() {
            return None;
        }
        Some(self.output.as_ref().map(PredictionOutput::joined).unwrap_or_default())
    }
}

/// Submits predictions to a hosted inference provider.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Create a prediction. Returns as soon as the provider has accepted it;
    /// the result arrives later on the request's webhook.
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, PredictionError>;
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_completed_filter() {
        let req = PredictionRequest::with_completion_webhook("v1", "prompt", "https://x/chat/abc");
        let value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            value,
            json!({
                "version": "v1",
                "input": { "prompt": "prompt" },
                "webhook": "https://x/chat/abc",
                "webhook_events_filter": ["completed"],
            })
        );
    }

    #[test]
    fn succeeded_fragments_are_concatenated() {
        let p: WebhookPayload =
            serde_json::from_value(json!({ "status": "succeeded", "output": ["a", "b"] }))
                .expect("parse");
        assert_eq!(p.completion_text().as_deref(), Some("ab"));
    }

    #[test]
    fn string_output_is_accepted() {
        let p: WebhookPayload =
            serde_json::from_value(json!({ "status": "succeeded", "output": "whole" }))
                .expect("parse");
        assert_eq!(p.completion_text().as_deref(), Some("whole"));
    }

    #[test]
    fn failed_and_unknown_statuses_have_no_completion() {
        let failed: WebhookPayload = serde_json::from_value(
            json!({ "id": "p1", "status": "failed", "output": null, "error": "boom" }),
        )
        .expect("parse");
        assert_eq!(failed.status, PredictionStatus::Failed);
        assert_eq!(failed.completion_text(), None);

        let odd: WebhookPayload =
            serde_json::from_value(json!({ "status": "exploded", "output": ["x"] })).expect("parse");
        assert_eq!(odd.status, PredictionStatus::Unknown);
        assert_eq!(odd.completion_text(), None);
        assert!(failed.status.is_terminal());
        assert!(!odd.status.is_terminal());
        assert!(!PredictionStatus::Processing.is_terminal());
    }

    #[test]
    fn success_without_output_is_empty_text() {
        let p: WebhookPayload =
            serde_json::from_value(json!({ "status": "succeeded" })).expect("parse");
        assert_eq!(p.completion_text().as_deref(), Some(""));
    }
}
