//! chatrelay-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables (CLI flags override).
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the prediction client.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.
//! 6. Close the database pool.

mod config;
mod entities;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use chatrelay_core::ReplicateClient;
use clap::Parser;
use tracing::{info, warn};

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "chatrelay-server", version, about = "Chat relay for hosted LLM predictions")]
struct Cli {
    /// Address to bind, overrides RELAY_BIND.
    #[arg(long)]
    bind: Option<String>,

    /// SQLite URL, overrides RELAY_DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn apply(self, cfg: &mut Config) {
        if let Some(bind) = self.bind {
            cfg.bind_address = bind;
        }
        if let Some(url) = self.database_url {
            cfg.database_url = url;
        }
        cfg.log_json |= self.log_json;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let mut cfg = Config::from_env();
    Cli::parse().apply(&mut cfg);

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: RELAY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. Prediction client ───────────────────────────────────────────────────
    let predictions = ReplicateClient::new(cfg.replicate_api_token.clone(), &cfg.replicate_api_base)?;
    if cfg.replicate_api_token.is_none() {
        warn!("REPLICATE_API_TOKEN is not set; submitted messages will fail with 502");
    }
    info!(public_base_url = %cfg.public_base_url, "webhooks will target this base URL");
    info!(endpoint = predictions.endpoint(), model_version = %cfg.model_version, "prediction client ready");

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, store, Arc::new(predictions)));
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    info!("chatrelay-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
