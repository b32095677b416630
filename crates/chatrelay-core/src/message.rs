use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role stored for messages typed by the human.
pub const ROLE_USER: &str = "user";
/// Role stored for messages produced by the model (and the starter message).
pub const ROLE_ASSISTANT: &str = "assistant";

/// Content of the synthetic assistant message that opens every conversation.
pub const STARTER_CONTENT: &str = "What is something you are passionate about?";

/// A single row in the `messages` table.
///
/// Rows are append-only. `id` and `created_at` are assigned by the store;
/// `role` is not validated, so anything a client sends is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub conversation_id: String,
    /// `"user"` or `"assistant"` by convention.
    pub role: String,
    pub content: String,
}

/// Role of the newest message, if any.
pub fn last_role(messages: &[Message]) -> Option<&str> {
    messages.last().map(|m| m.role.as_str())
}

#[cfg(test)]
mod test {
    use super::*;

    fn msg(id: i64, role: &str) -> Message {
        Message {
            id,
            created_at: Utc::now(),
            conversation_id: "c1".into(),
            role: role.into(),
            content: format!("m{id}"),
        }
    }

    #[test]
    fn last_role_of_empty_conversation_is_none() {
        assert_eq!(last_role(&[]), None);
        assert_eq!(last_role(&[msg(1, "assistant"), msg(2, "user")]), Some("user"));
    }

    #[test]
    fn serializes_with_table_column_names() {
        let value = serde_json::to_value(msg(7, "user")).expect("serialize");
        assert_eq!(value["id"], 7);
        assert_eq!(value["conversation_id"], "c1");
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "m7");
        assert!(value["created_at"].is_string());
    }
}
