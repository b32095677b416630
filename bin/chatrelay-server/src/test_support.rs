//! Shared fixtures for handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chatrelay_core::{
    Prediction, PredictionClient, PredictionError, PredictionRequest, PredictionStatus,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::routes;
use crate::state::AppState;

/// Records every submitted prediction instead of calling a provider.
#[derive(Default)]
pub struct RecordingClient {
    pub requests: Mutex<Vec<PredictionRequest>>,
    pub fail: bool,
}

impl RecordingClient {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<PredictionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionClient for RecordingClient {
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, PredictionError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(PredictionError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(Prediction {
            id: Some(format!("pred-{}", self.requests.lock().unwrap().len())),
            status: PredictionStatus::Starting,
            output: None,
            error: None,
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub client: Arc<RecordingClient>,
}

pub async fn test_app_with(config: Config, client: RecordingClient) -> TestApp {
    let store = SqliteStore::in_memory().await.expect("in-memory store");
    let client = Arc::new(client);
    let state = AppState::new(config, store, client.clone());
    let app = routes::build(Arc::new(state.clone()));
    TestApp { app, state, client }
}

pub async fn test_app() -> TestApp {
    let config = Config {
        public_base_url: "https://relay.example".into(),
        ..Config::default()
    };
    test_app_with(config, RecordingClient::default()).await
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(req).await.expect("infallible");
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    pub async fn send_raw(&self, req: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(req).await.expect("infallible")
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
