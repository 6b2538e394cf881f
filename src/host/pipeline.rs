//! Request dispatch pipeline.
//!
//! Routing contract: `GET /` attempts SSR and falls through to the adapted
//! middleware chain when rendering fails; every other path and method goes
//! to the chain directly. Render failures are logged with the request path
//! and never surface to the client; chain failures are the pipeline's to
//! report and map to a plain 500.

use crate::error::HostError;
use crate::host::adapter::MiddlewareAdapter;
use crate::host::render::RenderDispatcher;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared pipeline state: the render dispatcher and the adapted chain.
#[derive(Clone)]
pub struct PipelineState {
    dispatcher: Arc<RenderDispatcher>,
    chain: Arc<MiddlewareAdapter>,
}

/// Build the host router.
///
/// CORS allows all origins, methods and headers (standard for dev servers).
pub fn build_router(dispatcher: Arc<RenderDispatcher>, chain: Arc<MiddlewareAdapter>) -> Router {
    let state = PipelineState { dispatcher, chain };

    Router::new()
        .route("/", get(handle_root).fallback(handle_chain))
        .fallback(handle_chain)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// `GET /`: SSR first, CSR fallback.
async fn handle_root(State(state): State<PipelineState>, req: Request) -> Response {
    let path = req.uri().path().to_string();

    match state.dispatcher.dispatch().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "SSR render failed, downgrading to CSR");
            run_chain(&state, req).await
        }
    }
}

/// Every other path and method: adapted middleware chain.
async fn handle_chain(State(state): State<PipelineState>, req: Request) -> Response {
    run_chain(&state, req).await
}

async fn run_chain(state: &PipelineState, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let tail_path = path.clone();

    let result = state
        .chain
        .invoke(req, move |_req| async move { not_found(&tail_path) })
        .await;

    match result {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(path = %path, error = %err, "middleware chain failed");
            chain_error(&err)
        }
    }
}

/// End of the pipeline: nothing handled the request.
fn not_found(path: &str) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(format!("Not found: {}", path)))
        .unwrap()
}

fn chain_error(err: &HostError) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(format!("Middleware chain error: {}", err)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::host::adapter::{Continuation, MiddlewareUnit, RawRequest, RawResponse};
    use crate::host::render::{RenderEntry, SsrEnvironment, WebEnvironment};
    use async_trait::async_trait;
    use axum::http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    struct CountingSsr {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl SsrEnvironment for CountingSsr {
        async fn load_bundle(&self, name: &str) -> Result<Arc<dyn RenderEntry>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::BundleLoad {
                    name: name.to_string(),
                    message: "not compiled".to_string(),
                });
            }
            Ok(Arc::new(FixedEntry))
        }
    }

    struct FixedEntry;

    impl RenderEntry for FixedEntry {
        fn render(&self) -> Result<String, RenderError> {
            Ok("<h1>hi</h1>".to_string())
        }
    }

    struct FixedWeb;

    #[async_trait]
    impl WebEnvironment for FixedWeb {
        async fn transformed_html(&self, _name: &str) -> Result<String, RenderError> {
            Ok("<html><!--app-content--></html>".to_string())
        }
    }

    struct CountingChain {
        calls: Arc<AtomicUsize>,
    }

    impl MiddlewareUnit for CountingChain {
        fn call(&self, req: Arc<RawRequest>, res: Arc<RawResponse>, next: Continuation) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if req.path() == "/" || req.path() == "/index.html" {
                res.write(b"<html>csr shell</html>");
                res.end();
            } else if req.path() == "/assets/app.js" {
                res.write(b"console.log('app')");
                res.end();
            } else {
                next(None);
            }
        }
    }

    struct FailingChain;

    impl MiddlewareUnit for FailingChain {
        fn call(&self, _req: Arc<RawRequest>, _res: Arc<RawResponse>, next: Continuation) {
            next(Some("watcher died".into()));
        }
    }

    struct Harness {
        router: Router,
        ssr_calls: Arc<AtomicUsize>,
        chain_calls: Arc<AtomicUsize>,
    }

    fn harness(ssr_fails: bool) -> Harness {
        let ssr_calls = Arc::new(AtomicUsize::new(0));
        let chain_calls = Arc::new(AtomicUsize::new(0));

        let dispatcher = Arc::new(RenderDispatcher::new(
            Arc::new(CountingSsr {
                calls: Arc::clone(&ssr_calls),
                fail: ssr_fails,
            }),
            Arc::new(FixedWeb),
            "index",
            Duration::from_secs(5),
        ));
        let chain = Arc::new(MiddlewareAdapter::new(Arc::new(CountingChain {
            calls: Arc::clone(&chain_calls),
        })));

        Harness {
            router: build_router(dispatcher, chain),
            ssr_calls,
            chain_calls,
        }
    }

    fn request(method: Method, path: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_root_served_by_ssr() {
        let h = harness(false);
        let response = h.router.oneshot(request(Method::GET, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("X-Custom-Header").unwrap(), "Hello");
        assert_eq!(body_string(response).await, "<html><h1>hi</h1></html>");
        assert_eq!(h.chain_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_root_falls_back_to_chain_on_render_failure() {
        let h = harness(true);
        let response = h.router.oneshot(request(Method::GET, "/")).await.unwrap();

        // Not a 500: the chain's CSR shell is served instead.
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html>csr shell</html>");
        assert_eq!(h.chain_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_asset_path_bypasses_dispatcher() {
        let h = harness(false);
        let response = h
            .router
            .oneshot(request(Method::GET, "/assets/app.js"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "console.log('app')");
        assert_eq!(h.ssr_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.chain_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_get_root_goes_to_chain() {
        let h = harness(false);
        let response = h.router.oneshot(request(Method::POST, "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html>csr shell</html>");
        assert_eq!(h.ssr_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unhandled_path_is_404() {
        let h = harness(false);
        let response = h
            .router
            .oneshot(request(Method::GET, "/missing.txt"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chain_failure_maps_to_500() {
        let dispatcher = Arc::new(RenderDispatcher::new(
            Arc::new(CountingSsr {
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }),
            Arc::new(FixedWeb),
            "index",
            Duration::from_secs(5),
        ));
        let chain = Arc::new(MiddlewareAdapter::new(Arc::new(FailingChain)));
        let router = build_router(dispatcher, chain);

        let response = router
            .oneshot(request(Method::GET, "/anything"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("watcher died"));
    }
}
