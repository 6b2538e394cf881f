//! Static asset middleware for the local engine.
//!
//! Serves built client assets from the in-memory cache first, then from
//! disk. Expressed in the callback middleware contract so the host adapter
//! exercises the same bridge an external engine's middleware would.

use crate::host::adapter::{Continuation, MiddlewareUnit, RawRequest, RawResponse};
use crate::local::reload::inject_reload_script;
use crate::local::state::SharedState;
use axum::http::{header, HeaderValue, Method, StatusCode};
use std::sync::Arc;

/// Serves static assets from the engine's cache and root directory.
pub struct StaticAssetMiddleware {
    state: SharedState,
}

impl StaticAssetMiddleware {
    /// Create the middleware over shared engine state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl MiddlewareUnit for StaticAssetMiddleware {
    fn call(&self, req: Arc<RawRequest>, res: Arc<RawResponse>, next: Continuation) {
        // File I/O happens on a spawned task; `call` itself never blocks.
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if req.method() != Method::GET {
                next(None);
                return;
            }

            let path = if req.path() == "/" {
                "/index.html".to_string()
            } else {
                req.path().to_string()
            };

            if let Some((content, content_type)) = state.get_cached_file(&path) {
                respond(&res, &content, &content_type);
                return;
            }

            let file_path = state.root.join(path.trim_start_matches('/'));
            if file_path.is_file() {
                match tokio::fs::read(&file_path).await {
                    Ok(content) => {
                        respond(&res, &content, content_type_for(&path));
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %file_path.display(),
                            error = %e,
                            "failed to read asset"
                        );
                    }
                }
            }

            next(None);
        });
    }
}

/// Complete a terminal asset response on the raw handle.
///
/// HTML responses get the reload client script injected.
fn respond(res: &RawResponse, content: &[u8], content_type: &str) {
    let body = inject_reload_script(content, content_type);

    res.set_status(StatusCode::OK);
    if let Ok(value) = HeaderValue::from_str(content_type) {
        res.insert_header(header::CONTENT_TYPE, value);
    }
    res.insert_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    res.write(&body);
    res.end();
}

/// Determine content type from file extension.
fn content_type_for(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
