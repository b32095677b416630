//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use chatrelay_core::prediction::DEFAULT_API_BASE;

/// Version hash of the hosted vicuna-13b model.
pub const DEFAULT_MODEL_VERSION: &str =
    "6282abe6a492de4145d7bb601023762212f9ddbbe78278bd6771c8b3b2f2a13b";

/// Runtime configuration for chatrelay-server.
///
/// Every field has a sensible default so the server starts without any
/// environment variables set; only `replicate_api_token` must be provided
/// before messages can actually be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://chatrelay.db?mode=rwc"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Externally reachable base URL of this server; the provider posts
    /// completions to `<public_base_url>/chat/<conversation_id>`.
    pub public_base_url: String,

    /// Token for the inference provider.
    pub replicate_api_token: Option<String>,

    /// Base URL of the inference provider's API.
    pub replicate_api_base: String,

    /// Model version submitted with every prediction.
    pub model_version: String,

    /// How often the chat page refreshes while a reply is pending.
    pub poll_interval: Duration,

    /// After this long an unanswered prediction no longer blocks new messages.
    pub prediction_timeout: Duration,

    /// When set, webhook calls must carry `?token=<value>`.
    pub webhook_token: Option<String>,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or(&lookup, "RELAY_BIND", d.bind_address),
            database_url: env_or(&lookup, "RELAY_DATABASE_URL", d.database_url),
            log_level: env_or(&lookup, "RELAY_LOG", d.log_level),
            log_json: parse_bool(&lookup, "RELAY_LOG_JSON", d.log_json),
            public_base_url: env_or(&lookup, "RELAY_PUBLIC_BASE_URL", d.public_base_url),
            replicate_api_token: env_opt(&lookup, "REPLICATE_API_TOKEN"),
            replicate_api_base: env_or(&lookup, "REPLICATE_API_BASE", d.replicate_api_base),
            model_version: env_or(&lookup, "RELAY_MODEL_VERSION", d.model_version),
            poll_interval: parse_env(&lookup, "RELAY_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.poll_interval),
            prediction_timeout: parse_env(&lookup, "RELAY_PREDICTION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.prediction_timeout),
            webhook_token: env_opt(&lookup, "RELAY_WEBHOOK_TOKEN"),
            cors_allowed_origins: env_opt(&lookup, "RELAY_CORS_ORIGINS"),
            enable_swagger: parse_bool(&lookup, "RELAY_ENABLE_SWAGGER", d.enable_swagger),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            database_url: "sqlite://chatrelay.db?mode=rwc".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            public_base_url: "http://localhost:3000".to_owned(),
            replicate_api_token: None,
            replicate_api_base: DEFAULT_API_BASE.to_owned(),
            model_version: DEFAULT_MODEL_VERSION.to_owned(),
            poll_interval: Duration::from_millis(2000),
            prediction_timeout: Duration::from_secs(300),
            webhook_token: None,
            cors_allowed_origins: None,
            enable_swagger: true,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: String) -> String {
    lookup(key).unwrap_or(default)
}

/// Unset and blank values are both `None`.
fn env_opt(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// `1`/`true` and `0`/`false` (any case); anything else keeps the default.
fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).as_deref().map(str::trim) {
        Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
        Some(v) if v == "0" || v.eq_ignore_ascii_case("false") => false,
        _ => default,
    }
}

/// `None` when unset or unparsable.
fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
