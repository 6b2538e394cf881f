//! Dev-server engine collaborator surface.
//!
//! The engine is the externally owned dev-server instance: it owns the
//! bundle graph, the asset middleware chain and the live-reload machinery.
//! The host never constructs one - it only sequences the engine's use during
//! startup and guarantees it is closed at most once during shutdown.

use crate::error::Result;
use crate::host::adapter::MiddlewareUnit;
use crate::host::render::{SsrEnvironment, WebEnvironment};
use crate::host::transport::BoundTransport;
use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;

/// A development server engine hosted by the pipeline.
#[async_trait]
pub trait DevServerEngine: Send + Sync {
    /// The engine's asset middleware chain.
    fn middlewares(&self) -> Arc<dyn MiddlewareUnit>;

    /// Environment providing compiled server bundles.
    fn ssr(&self) -> Arc<dyn SsrEnvironment>;

    /// Environment providing transformed HTML templates.
    fn web(&self) -> Arc<dyn WebEnvironment>;

    /// Port the engine assigned for the transport to bind.
    fn port(&self) -> u16;

    /// Extra routes the engine needs in the router (live-reload endpoints).
    ///
    /// Merged into the host router before the transport binds; broadcasting
    /// stays inert until [`connect_web_socket`](Self::connect_web_socket).
    fn reload_router(&self) -> Router {
        Router::new()
    }

    /// Notification that the transport is accepting connections.
    ///
    /// Called only after the bind has been confirmed, never before.
    async fn after_listen(&self);

    /// Attach the live-reload event pump to the bound transport.
    async fn connect_web_socket(&self, bound: &BoundTransport) -> Result<()>;

    /// Release the engine's resources (watchers, reload clients).
    async fn close(&self) -> Result<()>;
}
