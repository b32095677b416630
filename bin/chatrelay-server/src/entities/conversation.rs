use std::future::Future;

use chatrelay_core::{Message, ROLE_ASSISTANT};
use chrono::Utc;

use crate::entities::SqliteStore;

type MessageRow = (i64, String, String, String, Option<String>);

pub trait ConversationStore: Send + Sync + 'static {
    /// All messages of a conversation, oldest first. Empty if unknown.
    fn fetch_conversation(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;

    /// Append one message. `role` is stored verbatim.
    fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Insert an assistant message with `content` only if the conversation has
    /// no rows yet. Returns whether a row was written.
    fn insert_starter_if_empty(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl ConversationStore for SqliteStore {
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, created_at, conversation_id, role, content \
             FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO messages (conversation_id, role, content) VALUES (?1, ?2, ?3)")
            .bind(conversation_id)
            .bind(role)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_starter_if_empty(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<bool, sqlx::Error> {
        // SQLite takes the write lock only when the INSERT half runs, so two
        // connections racing here fail with SQLITE_BUSY instead of queueing.
        let _guard = self.starter_lock.lock().await;
        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, role, content) \
             SELECT ?1, ?2, ?3 \
             WHERE NOT EXISTS (SELECT 1 FROM messages WHERE conversation_id = ?1)",
        )
        .bind(conversation_id)
        .bind(ROLE_ASSISTANT)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn into_message((id, created_at, conversation_id, role, content): MessageRow) -> Message {
    Message {
        id,
        created_at: created_at.parse().unwrap_or_else(|e: chrono::ParseError| {
            tracing::warn!(raw = %created_at, error = %e, "failed to parse message created_at; using now");
            Utc::now()
        }),
        conversation_id,
        role,
        content: content.unwrap_or_default(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chatrelay_core::STARTER_CONTENT;

    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.expect("in-memory store")
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let s = store().await;
        assert!(s.fetch_conversation("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_come_back_in_insertion_order() {
        let s = store().await;
        for i in 0..5 {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            s.append_message("c1", role, &format!("m{i}")).await.unwrap();
        }
        s.append_message("other", "user", "elsewhere").await.unwrap();

        let conv = s.fetch_conversation("c1").await.unwrap();
        let contents: Vec<&str> = conv.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
        assert!(conv.iter().all(|m| m.conversation_id == "c1"));
        assert!(conv.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert!(conv.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn arbitrary_roles_are_stored_verbatim() {
        let s = store().await;
        s.append_message("c", "narrator", "once upon a time").await.unwrap();
        let conv = s.fetch_conversation("c").await.unwrap();
        assert_eq!(conv[0].role, "narrator");
    }

    #[tokio::test]
    async fn starter_is_inserted_once() {
        let s = store().await;
        assert!(s.insert_starter_if_empty("c", STARTER_CONTENT).await.unwrap());
        assert!(!s.insert_starter_if_empty("c", STARTER_CONTENT).await.unwrap());

        let conv = s.fetch_conversation("c").await.unwrap();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv[0].role, ROLE_ASSISTANT);
        assert_eq!(conv[0].content, STARTER_CONTENT);
    }

    #[tokio::test]
    async fn starter_is_skipped_for_non_empty_conversation() {
        let s = store().await;
        s.append_message("c", "user", "first").await.unwrap();
        assert!(!s.insert_starter_if_empty("c", STARTER_CONTENT).await.unwrap());
        assert_eq!(s.fetch_conversation("c").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bootstraps_yield_a_single_starter() {
        let s = Arc::new(store().await);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                tokio::spawn(async move { s.insert_starter_if_empty("race", STARTER_CONTENT).await })
            })
            .collect();

        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(s.fetch_conversation("race").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_connections() {
        let path = std::env::temp_dir().join(format!("chatrelay-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}", path.display());
        {
            let s = SqliteStore::connect(&url).await.unwrap();
            s.append_message("c", "user", "kept").await.unwrap();
        }
        let s = SqliteStore::connect(&url).await.unwrap();
        let conv = s.fetch_conversation("c").await.unwrap();
        assert_eq!(conv[0].content, "kept");
        let _ = std::fs::remove_file(&path);
    }
}
