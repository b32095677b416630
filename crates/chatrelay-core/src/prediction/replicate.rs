use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Prediction, PredictionClient, PredictionError, PredictionRequest};

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com";
const PREDICTIONS_PATH: &str = "/v1/predictions";

/// Client for Replicate's prediction API (or any server speaking the same
/// `POST /v1/predictions` protocol).
pub struct ReplicateClient {
    client: Client,
    api_token: Option<String>,
    /// Full endpoint URL (base + PREDICTIONS_PATH).
    url: String,
}

impl ReplicateClient {
    /// Fails only if the HTTP client cannot be constructed (e.g. no TLS backend).
    pub fn new(
        api_token: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PredictionError> {
        let base: String = base_url.into();
        let url = format!("{}{PREDICTIONS_PATH}", base.trim_end_matches('/'));
        let client = Client::builder()
            .user_agent(concat!("chatrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_token: api_token.filter(|t| !t.is_empty()),
            url,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PredictionClient for ReplicateClient {
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, PredictionError> {
        let token = self.api_token.as_deref().ok_or(PredictionError::MissingToken)?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "prediction create rejected");
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let prediction: Prediction = response.json().await?;
        debug!(prediction_id = ?prediction.id, status = ?prediction.status, "prediction created");
        Ok(prediction)
    }
}
