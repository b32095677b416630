//! Optional shared-secret check for the completion webhook.
//!
//! The provider cannot send custom headers, so the secret travels in the
//! webhook URL as `?token=...`. Only `POST` (webhook delivery) is guarded;
//! the browser-facing `GET`/`PUT` on the same path are left alone.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookTokenQuery {
    pub token: Option<String>,
}

pub async fn require_webhook_token(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::POST {
        if let Some(expected) = state.config.webhook_token.as_deref() {
            let provided = Query::<WebhookTokenQuery>::try_from_uri(req.uri())
                .ok()
                .and_then(|Query(q)| q.token);
            if provided.as_deref() != Some(expected) {
                warn!(path = %req.uri().path(), "webhook rejected: missing or wrong token");
                return ServerError::Unauthorized.into_response();
            }
        }
    }
    next.run(req).await
}
