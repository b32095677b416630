//! Chat page.
//!
//! `GET /` without an `id` query parameter redirects to a freshly generated
//! conversation id so every page load has a stable, shareable URL.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use chatrelay_core::id::new_conversation_id;
use minijinja::{Environment, context};
use serde::Deserialize;

use crate::error::ServerError;
use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../assets/index.html");
const PAGE_TITLE: &str = "GPT-me";

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub id: Option<String>,
}

/// Register page routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/new", get(new_conversation))
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ServerError> {
    match query.id.filter(|id| !id.is_empty()) {
        Some(id) => Ok(Html(render_page(&state, &id)?).into_response()),
        None => Ok(new_conversation().await.into_response()),
    }
}

pub async fn new_conversation() -> Redirect {
    Redirect::to(&format!("/?id={}", new_conversation_id()))
}

fn render_page(state: &AppState, conversation_id: &str) -> Result<String, ServerError> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)
        .map_err(|e| ServerError::Internal(format!("chat page template: {e}")))?;
    let template = env
        .get_template("index.html")
        .map_err(|e| ServerError::Internal(format!("chat page template: {e}")))?;
    template
        .render(context! {
            title => PAGE_TITLE,
            conversation_id => conversation_id,
            poll_interval_ms => state.poll.interval_ms(),
        })
        .map_err(|e| ServerError::Internal(format!("chat page render: {e}")))
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use axum::http::{StatusCode, header};
    use http_body_util::BodyExt;

    use crate::config::Config;
    use crate::test_support::{RecordingClient, empty_request, test_app, test_app_with};

    async fn html(t: &crate::test_support::TestApp, uri: &str) -> (StatusCode, String) {
        let response = t.send_raw(empty_request("GET", uri)).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn root_without_id_redirects_to_new_conversation() {
        let t = test_app().await;
        for uri in ["/", "/?id=", "/new"] {
            let response = t.send_raw(empty_request("GET", uri)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            let location = response.headers()[header::LOCATION].to_str().unwrap();
            let id = location.strip_prefix("/?id=").expect("redirect to page");
            assert_eq!(id.len(), chatrelay_core::id::CONVERSATION_ID_LEN);
        }
    }

    #[tokio::test]
    async fn page_embeds_conversation_and_poll_interval() {
        let config = Config {
            poll_interval: Duration::from_millis(750),
            ..Config::default()
        };
        let t = test_app_with(config, RecordingClient::default()).await;
        let (status, body) = html(&t, "/?id=abc123").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"const conversationId = "abc123";"#));
        assert!(body.contains("const retryMs = 750;"));
        assert!(body.contains(r#"id="notice""#), "page has an inline error notice");
    }

    #[tokio::test]
    async fn conversation_id_cannot_break_out_of_script() {
        let t = test_app().await;
        let (_, body) = html(&t, "/?id=%3C%2Fscript%3E").await;
        assert!(!body.contains("</script>\";"));
        assert_eq!(body.matches("</script>").count(), 1);
    }
}
