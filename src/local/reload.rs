//! Live reload over Server-Sent Events.
//!
//! Provides the SSE endpoint reload clients subscribe to and the client
//! script injected into served HTML. The routes are merged into the host
//! router before the transport binds; events only flow once the watcher
//! pump is attached.

use crate::local::state::{ReloadEvent, SharedState};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::get;
use axum::Router;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

/// URL path the reload client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__devhost_reload__.js";

/// URL path of the SSE event stream.
pub const SSE_PATH: &str = "/__devhost_sse__";

/// Build the live-reload routes.
pub fn reload_router(state: SharedState) -> Router {
    Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .with_state(state)
}

/// Handle SSE connections for reload events.
async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<
    impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;

    let (id, rx) = state.register_client();

    tracing::debug!(client = id, "reload client connected");

    state.broadcast(&ReloadEvent::ClientConnected { id }).await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

/// Serve the reload client script.
async fn handle_reload_script() -> impl IntoResponse {
    const RELOAD_SCRIPT: &str = include_str!("../../assets/dev/reload-client.js");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(RELOAD_SCRIPT))
        .unwrap()
}

/// Inject the reload client script into HTML content.
///
/// Adds the script tag before the closing `</body>` tag, or appends it when
/// the document has none. Non-HTML content is returned unchanged.
pub fn inject_reload_script(content: &[u8], content_type: &str) -> Vec<u8> {
    if !content_type.starts_with("text/html") {
        return content.to_vec();
    }

    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 10);
        result.push_str(&html[..pos]);
        result.push_str("\n  ");
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.to_string();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::state::EngineState;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn test_inject_reload_script_with_body() {
        let html = b"<html><body><h1>Test</h1></body></html>";
        let result = inject_reload_script(html, "text/html");

        let result_str = String::from_utf8(result).unwrap();
        assert!(result_str.contains(RELOAD_SCRIPT_PATH));

        // Script must land before </body>.
        let script_pos = result_str.find(RELOAD_SCRIPT_PATH).unwrap();
        let body_pos = result_str.find("</body>").unwrap();
        assert!(script_pos < body_pos);
    }

    #[test]
    fn test_inject_reload_script_without_body() {
        let html = b"<html><h1>Test</h1></html>";
        let result = inject_reload_script(html, "text/html");

        assert!(String::from_utf8(result).unwrap().contains(RELOAD_SCRIPT_PATH));
    }

    #[test]
    fn test_inject_reload_script_non_html() {
        let js = b"console.log('test');";
        let result = inject_reload_script(js, "application/javascript");
        assert_eq!(result, js);
    }

    #[tokio::test]
    async fn test_reload_script_route() {
        let state = Arc::new(EngineState::new(PathBuf::from("dist")));
        let router = reload_router(state);

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(RELOAD_SCRIPT_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/javascript"
        );
    }
}
