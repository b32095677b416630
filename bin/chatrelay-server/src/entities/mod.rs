//! Database abstraction layer.
//!
//! [`ConversationStore`] defines the persistence interface for conversation
//! turns. The default implementation is [`SqliteStore`]. To swap to another
//! database, implement [`ConversationStore`] for the new type and change the
//! concrete type in [`crate::state::AppState`].
//!
//! Trait methods use `impl Future` in their signatures, so no `async-trait`
//! is required on this side.

pub mod conversation;

pub use conversation::ConversationStore;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

/// SQLite-backed conversation store.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    /// Serialises starter inserts; see [`ConversationStore::insert_starter_if_empty`].
    starter_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://chatrelay.db?mode=rwc"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database, used by tests.
    ///
    /// Every SQLite `:memory:` connection is a separate database, so the pool
    /// is pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            starter_lock: Mutex::new(()),
        })
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection; later queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
