//! SSR dispatch for the root page.
//!
//! The dispatcher runs one request through the server render path: load the
//! compiled server bundle, invoke its render entry once, fetch the
//! transformed HTML template, and splice the markup into the template's
//! placeholder. Any failure is returned to the caller, which is expected to
//! fall through to the adapted middleware chain (CSR) instead of surfacing an
//! error response. SSR failures are normal during active development (bundle
//! not yet compiled, transient module errors) and must never crash a request.

use crate::error::RenderError;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;

/// Marker in the HTML template where rendered markup is inserted.
pub const APP_PLACEHOLDER: &str = "<!--app-content-->";

/// Demonstrative header attached to every SSR response.
pub const CUSTOM_HEADER: (&str, &str) = ("X-Custom-Header", "Hello");

/// Capability surface for loading compiled server bundles.
///
/// This is the narrow contract the dispatcher depends on; the dev-server
/// engine exposes much more, but none of it is visible here.
#[async_trait]
pub trait SsrEnvironment: Send + Sync {
    /// Load the compiled server bundle for a logical page name.
    async fn load_bundle(&self, name: &str) -> Result<Arc<dyn RenderEntry>, RenderError>;
}

/// Capability surface for fetching transformed HTML templates.
#[async_trait]
pub trait WebEnvironment: Send + Sync {
    /// Fetch the transformed HTML template for a logical page name.
    async fn transformed_html(&self, name: &str) -> Result<String, RenderError>;
}

/// Render entry point of a loaded server bundle.
///
/// `render` is invoked synchronously exactly once per request and must be
/// pure from the dispatcher's perspective: no retries are attempted.
pub trait RenderEntry: Send + Sync {
    /// Produce the page markup.
    fn render(&self) -> Result<String, RenderError>;
}

impl std::fmt::Debug for dyn RenderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RenderEntry")
    }
}

/// Dispatches one SSR attempt per root-path request.
pub struct RenderDispatcher {
    ssr: Arc<dyn SsrEnvironment>,
    web: Arc<dyn WebEnvironment>,
    entry: String,
    timeout: Duration,
}

impl RenderDispatcher {
    /// Create a dispatcher for a logical page entry.
    ///
    /// # Arguments
    ///
    /// * `ssr` - Environment providing compiled server bundles
    /// * `web` - Environment providing transformed HTML templates
    /// * `entry` - Logical page name (e.g. "index")
    /// * `timeout` - Upper bound for the whole SSR attempt
    pub fn new(
        ssr: Arc<dyn SsrEnvironment>,
        web: Arc<dyn WebEnvironment>,
        entry: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ssr,
            web,
            entry: entry.into(),
            timeout,
        }
    }

    /// Attempt a full server render.
    ///
    /// On success returns the terminal response: status 200, the fixed
    /// demonstrative header plus `Content-Type: text/html`, and the template
    /// with its placeholder replaced by the rendered markup.
    ///
    /// # Errors
    ///
    /// Returns the first failure of bundle load, render call, template fetch
    /// or merge. A stalled render is cut off by the configured timeout so the
    /// request can still degrade to CSR. No partial response is ever written.
    pub async fn dispatch(&self) -> Result<Response, RenderError> {
        tokio::time::timeout(self.timeout, self.render_page())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))?
    }

    async fn render_page(&self) -> Result<Response, RenderError> {
        let bundle = self.ssr.load_bundle(&self.entry).await?;

        let markup = bundle.render()?;

        let template = self.web.transformed_html(&self.entry).await?;

        let html = merge_markup(&template, &markup)?;

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CUSTOM_HEADER.0, CUSTOM_HEADER.1)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from(html))
            .unwrap())
    }
}

/// Splice rendered markup into the template's placeholder.
///
/// A single substitution: templates are expected to contain the placeholder
/// exactly once. If it appears more than once, only the first occurrence is
/// replaced; if it is absent the merge fails and the request degrades to CSR.
pub fn merge_markup(template: &str, markup: &str) -> Result<String, RenderError> {
    if !template.contains(APP_PLACEHOLDER) {
        return Err(RenderError::PlaceholderMissing);
    }
    Ok(template.replacen(APP_PLACEHOLDER, markup, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSsr {
        markup: &'static str,
    }

    #[async_trait]
    impl SsrEnvironment for StaticSsr {
        async fn load_bundle(&self, _name: &str) -> Result<Arc<dyn RenderEntry>, RenderError> {
            Ok(Arc::new(StaticEntry {
                markup: self.markup,
            }))
        }
    }

    struct StaticEntry {
        markup: &'static str,
    }

    impl RenderEntry for StaticEntry {
        fn render(&self) -> Result<String, RenderError> {
            Ok(self.markup.to_string())
        }
    }

    struct StaticWeb {
        template: &'static str,
    }

    #[async_trait]
    impl WebEnvironment for StaticWeb {
        async fn transformed_html(&self, _name: &str) -> Result<String, RenderError> {
            Ok(self.template.to_string())
        }
    }

    struct FailingSsr;

    #[async_trait]
    impl SsrEnvironment for FailingSsr {
        async fn load_bundle(&self, name: &str) -> Result<Arc<dyn RenderEntry>, RenderError> {
            Err(RenderError::BundleLoad {
                name: name.to_string(),
                message: "not compiled".to_string(),
            })
        }
    }

    struct StalledSsr;

    #[async_trait]
    impl SsrEnvironment for StalledSsr {
        async fn load_bundle(&self, _name: &str) -> Result<Arc<dyn RenderEntry>, RenderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("the dispatcher must cut this off");
        }
    }

    fn dispatcher(
        ssr: Arc<dyn SsrEnvironment>,
        web: Arc<dyn WebEnvironment>,
    ) -> RenderDispatcher {
        RenderDispatcher::new(ssr, web, "index", Duration::from_secs(5))
    }

    #[test]
    fn test_merge_replaces_placeholder_only() {
        let merged = merge_markup("<html><!--app-content--></html>", "<h1>hi</h1>").unwrap();
        assert_eq!(merged, "<html><h1>hi</h1></html>");
    }

    #[test]
    fn test_merge_preserves_surrounding_text() {
        let template = "<html>\n  <body><!--app-content--></body>\n</html>";
        let merged = merge_markup(template, "X").unwrap();
        assert_eq!(merged, "<html>\n  <body>X</body>\n</html>");
    }

    #[test]
    fn test_merge_replaces_first_of_multiple() {
        let merged = merge_markup("<!--app-content--><!--app-content-->", "X").unwrap();
        assert_eq!(merged, "X<!--app-content-->");
    }

    #[test]
    fn test_merge_missing_placeholder_fails() {
        let err = merge_markup("<html></html>", "X").unwrap_err();
        assert!(matches!(err, RenderError::PlaceholderMissing));
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let dispatcher = dispatcher(
            Arc::new(StaticSsr {
                markup: "<h1>hi</h1>",
            }),
            Arc::new(StaticWeb {
                template: "<html><!--app-content--></html>",
            }),
        );

        let response = dispatcher.dispatch().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
        assert_eq!(response.headers().get("X-Custom-Header").unwrap(), "Hello");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html><h1>hi</h1></html>");
    }

    #[tokio::test]
    async fn test_dispatch_bundle_load_failure() {
        let dispatcher = dispatcher(
            Arc::new(FailingSsr),
            Arc::new(StaticWeb {
                template: "<html><!--app-content--></html>",
            }),
        );

        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, RenderError::BundleLoad { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_template_without_placeholder_fails() {
        let dispatcher = dispatcher(
            Arc::new(StaticSsr { markup: "X" }),
            Arc::new(StaticWeb {
                template: "<html></html>",
            }),
        );

        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, RenderError::PlaceholderMissing));
    }

    #[tokio::test]
    async fn test_dispatch_times_out_on_stalled_render() {
        let dispatcher = RenderDispatcher::new(
            Arc::new(StalledSsr),
            Arc::new(StaticWeb {
                template: "<html><!--app-content--></html>",
            }),
            "index",
            Duration::from_millis(20),
        );

        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));
    }
}
