//! Conversation relay routes.
//!
//! All three verbs share `/chat/{conversation_id}`:
//! - `GET` reads the conversation, bootstrapping the starter message.
//! - `PUT` stores a user message and submits a prediction, or queues it
//!   behind the one already pending.
//! - `POST` is the provider's completion webhook.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router, middleware};
use chatrelay_core::{
    Message, PredictionRequest, ROLE_ASSISTANT, STARTER_CONTENT, WebhookPayload,
};
use reqwest::Url;
use tracing::{debug, info, warn};
use utoipa::OpenApi;

use crate::config::Config;
use crate::entities::ConversationStore;
use crate::error::ServerError;
use crate::middleware::auth;
use crate::schemas::chat::{
    ConversationResponse, ConversationUpdateResponse, MessageResponse, SubmitMessageRequest,
    WebhookBody, to_responses,
};
use crate::state::{AppState, Begin};

/// Matches the `conversation_id VARCHAR(50)` column.
const MAX_CONVERSATION_ID_LEN: usize = 50;

#[derive(OpenApi)]
#[openapi(
    paths(get_conversation, submit_message, receive_completion),
    components(schemas(
        ConversationResponse,
        ConversationUpdateResponse,
        MessageResponse,
        SubmitMessageRequest,
        WebhookBody
    ))
)]
pub struct ChatApi;

/// Register conversation routes. `POST` is guarded by the optional webhook token.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/chat/{conversation_id}",
            get(get_conversation)
                .put(submit_message)
                .post(receive_completion),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_webhook_token,
        ))
}

fn validate_conversation_id(id: &str) -> Result<(), ServerError> {
    if id.is_empty() || id.len() > MAX_CONVERSATION_ID_LEN {
        return Err(ServerError::BadRequest(format!(
            "conversation id must be 1..={MAX_CONVERSATION_ID_LEN} bytes"
        )));
    }
    Ok(())
}

/// Callback target handed to the provider for `conversation_id`.
pub fn webhook_url(config: &Config, conversation_id: &str) -> Result<String, ServerError> {
    let mut url = Url::parse(&config.public_base_url).map_err(|e| {
        ServerError::Internal(format!(
            "invalid public base url '{}': {e}",
            config.public_base_url
        ))
    })?;
    url.path_segments_mut()
        .map_err(|_| ServerError::Internal("public base url cannot be a base".into()))?
        .pop_if_empty()
        .push("chat")
        .push(conversation_id);
    if let Some(token) = config.webhook_token.as_deref() {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url.into())
}

/// Refresh delay for the page, from the poll contract and the pending state.
fn poll_after_ms(state: &AppState, conversation_id: &str, conversation: &[Message]) -> Option<u64> {
    state
        .poll
        .next_delay(conversation, state.in_flight.is_pending(conversation_id))
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// Read a conversation, inserting the starter message if it has none.
#[utoipa::path(
    get,
    path = "/chat/{conversation_id}",
    tag = "chat",
    params(("conversation_id" = String, Path, description = "Client-chosen conversation id")),
    responses(
        (status = 200, description = "Conversation, oldest message first", body = ConversationResponse),
        (status = 400, description = "Invalid conversation id"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationResponse>, ServerError> {
    validate_conversation_id(&conversation_id)?;
    info!(%conversation_id, "GET conversation");

    let mut conversation = state.store.fetch_conversation(&conversation_id).await?;
    if conversation.is_empty() {
        if state
            .store
            .insert_starter_if_empty(&conversation_id, STARTER_CONTENT)
            .await?
        {
            debug!(%conversation_id, "starter message inserted");
        }
        conversation = state.store.fetch_conversation(&conversation_id).await?;
    }

    Ok(Json(ConversationResponse {
        poll_after_ms: poll_after_ms(&state, &conversation_id, &conversation),
        conversation: to_responses(&conversation),
    }))
}

/// Store a message and ask the provider for the assistant's reply.
///
/// Returns as soon as the prediction is accepted; the reply is appended later
/// by the webhook. The message is always stored. While a prediction is
/// outstanding no second one is submitted; the webhook dispatches a follow-up
/// covering everything queued meanwhile.
#[utoipa::path(
    put,
    path = "/chat/{conversation_id}",
    tag = "chat",
    params(("conversation_id" = String, Path, description = "Client-chosen conversation id")),
    request_body = SubmitMessageRequest,
    responses(
        (status = 200, description = "Message stored; prediction submitted or queued", body = ConversationUpdateResponse),
        (status = 400, description = "Invalid conversation id"),
        (status = 502, description = "Inference provider rejected the prediction; message kept"),
    )
)]
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<Json<ConversationUpdateResponse>, ServerError> {
    validate_conversation_id(&conversation_id)?;
    info!(%conversation_id, role = %req.role, content_len = req.content.len(), "PUT message");

    state
        .store
        .append_message(&conversation_id, &req.role, &req.content)
        .await?;
    let conversation = state.store.fetch_conversation(&conversation_id).await?;

    match state.in_flight.begin(&conversation_id) {
        Begin::Queued => {
            info!(%conversation_id, "prediction pending; message queued for follow-up");
        }
        Begin::Started => {
            if let Err(e) = dispatch_prediction(&state, &conversation_id, &conversation).await {
                state.in_flight.finish(&conversation_id);
                return Err(e);
            }
        }
    }

    Ok(Json(ConversationUpdateResponse {
        success: true,
        poll_after_ms: poll_after_ms(&state, &conversation_id, &conversation),
        conversation: to_responses(&conversation),
    }))
}

async fn dispatch_prediction(
    state: &AppState,
    conversation_id: &str,
    conversation: &[Message],
) -> Result<(), ServerError> {
    let request = PredictionRequest::with_completion_webhook(
        &state.config.model_version,
        state.prompt.format(conversation),
        webhook_url(&state.config, conversation_id)?,
    );
    let prediction = state.predictions.create_prediction(&request).await?;
    info!(%conversation_id, prediction_id = ?prediction.id, "prediction submitted");
    Ok(())
}

/// Completion webhook: append the prediction output as an assistant message.
///
/// Anything other than `succeeded` is logged and dropped. A terminal status
/// releases the conversation, or dispatches the follow-up prediction when
/// messages were queued while this one was outstanding.
#[utoipa::path(
    post,
    path = "/chat/{conversation_id}",
    tag = "chat",
    params(
        ("conversation_id" = String, Path, description = "Conversation the prediction belongs to"),
        ("token" = Option<String>, Query, description = "Required when a webhook token is configured"),
    ),
    request_body = WebhookBody,
    responses(
        (status = 200, description = "Webhook processed", body = ConversationUpdateResponse),
        (status = 401, description = "Missing or wrong webhook token"),
    )
)]
pub async fn receive_completion(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<ConversationUpdateResponse>, ServerError> {
    validate_conversation_id(&conversation_id)?;
    info!(
        %conversation_id,
        prediction_id = ?payload.id,
        status = ?payload.status,
        "POST webhook"
    );

    match payload.completion_text() {
        Some(text) => {
            state
                .store
                .append_message(&conversation_id, ROLE_ASSISTANT, &text)
                .await?;
        }
        None => warn!(
            %conversation_id,
            status = ?payload.status,
            error = ?payload.error,
            "prediction did not succeed; nothing appended"
        ),
    }

    let conversation = state.store.fetch_conversation(&conversation_id).await?;

    if payload.status.is_terminal() && state.in_flight.complete(&conversation_id) {
        info!(%conversation_id, "dispatching follow-up for queued messages");
        // Logged only; the webhook itself still succeeds.
        if let Err(e) = dispatch_prediction(&state, &conversation_id, &conversation).await {
            state.in_flight.finish(&conversation_id);
            warn!(%conversation_id, error = %e, "follow-up prediction failed");
        }
    }

    Ok(Json(ConversationUpdateResponse {
        success: true,
        poll_after_ms: poll_after_ms(&state, &conversation_id, &conversation),
        conversation: to_responses(&conversation),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
