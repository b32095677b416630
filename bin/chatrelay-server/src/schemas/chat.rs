//! Request / response types for the `/chat/{conversation_id}` routes.

use chatrelay_core::{Message, PredictionOutput, ROLE_USER};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_role() -> String {
    ROLE_USER.to_owned()
}

/// One stored conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    /// RFC 3339 timestamp assigned by the store.
    pub created_at: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
}

impl From<&Message> for MessageResponse {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            created_at: m.created_at.to_rfc3339(),
            conversation_id: m.conversation_id.clone(),
            role: m.role.clone(),
            content: m.content.clone(),
        }
    }
}

pub fn to_responses(messages: &[Message]) -> Vec<MessageResponse> {
    messages.iter().map(MessageResponse::from).collect()
}

/// Response body of `GET /chat/{conversation_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub conversation: Vec<MessageResponse>,
    /// Milliseconds until the page should fetch again; `null` once the
    /// assistant has answered everything.
    pub poll_after_ms: Option<u64>,
}

/// Response body of `PUT` and `POST /chat/{conversation_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationUpdateResponse {
    pub success: bool,
    pub conversation: Vec<MessageResponse>,
    pub poll_after_ms: Option<u64>,
}

/// Request body of `PUT /chat/{conversation_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitMessageRequest {
    /// Author role; defaults to `"user"`.
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
    /// Display name sent by the page; not stored.
    #[serde(default)]
    pub name: Option<String>,
}

/// Documentation shape of the provider's webhook body.
///
/// Deserialisation uses [`chatrelay_core::WebhookPayload`]; this type only
/// feeds the OpenAPI document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookBody {
    pub id: Option<String>,
    /// `starting`, `processing`, `succeeded`, `failed` or `canceled`.
    pub status: String,
    /// Output fragments, concatenated into one assistant message.
    #[schema(value_type = Option<Vec<String>>)]
    pub output: Option<PredictionOutput>,
}
