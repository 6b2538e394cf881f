//! Server lifecycle: ordered startup, idempotent shutdown.
//!
//! The lifecycle coordinates two independently owned long-lived resources -
//! the transport and the dev-server engine - without leaking or
//! double-closing either. Startup is strictly ordered: router construction,
//! transport bind, then the engine's readiness notification (only after the
//! bind is confirmed, so clients can never connect before the socket
//! exists), then the live-reload attachment. Shutdown stops the transport
//! and closes the engine, attempting both even if one fails.

use crate::error::Result;
use crate::host::adapter::MiddlewareAdapter;
use crate::host::engine::DevServerEngine;
use crate::host::pipeline;
use crate::host::render::RenderDispatcher;
use crate::host::transport::{BoundTransport, Transport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owns startup and shutdown ordering for the host server.
///
/// Constructed once by the entry point; `stop` is safe to call from any
/// number of signal handlers, repeat calls are no-ops beyond the first.
pub struct ServerLifecycle {
    engine: Arc<dyn DevServerEngine>,
    entry: String,
    render_timeout: Duration,
    bound: Mutex<Option<Arc<BoundTransport>>>,
    stopped: AtomicBool,
}

impl ServerLifecycle {
    /// Create a lifecycle around a dev-server engine.
    ///
    /// # Arguments
    ///
    /// * `engine` - The externally owned dev-server instance
    /// * `entry` - Logical page name for SSR dispatch
    /// * `render_timeout` - Upper bound for one SSR attempt
    pub fn new(
        engine: Arc<dyn DevServerEngine>,
        entry: impl Into<String>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            entry: entry.into(),
            render_timeout,
            bound: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Start the server.
    ///
    /// Builds the dispatch pipeline (root path: SSR with chain fallback,
    /// everything else: chain), binds the transport, notifies the engine that
    /// listening has started and attaches the live-reload pump.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal at startup: the caller must not report the
    /// server as ready.
    pub async fn start(&self, transport: &dyn Transport) -> Result<Arc<BoundTransport>> {
        let dispatcher = Arc::new(RenderDispatcher::new(
            self.engine.ssr(),
            self.engine.web(),
            self.entry.clone(),
            self.render_timeout,
        ));
        let chain = Arc::new(MiddlewareAdapter::new(self.engine.middlewares()));

        let app = pipeline::build_router(dispatcher, chain).merge(self.engine.reload_router());

        let bound = Arc::new(transport.bind(app).await?);

        // The bind has resolved: the socket is accepting connections.
        self.engine.after_listen().await;
        self.engine.connect_web_socket(&bound).await?;

        *self.bound.lock() = Some(Arc::clone(&bound));
        Ok(bound)
    }

    /// Stop the server.
    ///
    /// Stops accepting connections, then closes the engine. Both steps are
    /// attempted even if the first fails; the first error is returned after
    /// both attempts. Idempotent: repeat calls return `Ok(())` immediately.
    ///
    /// # Errors
    ///
    /// Returns the first close failure encountered, if any.
    pub async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut first_err = None;

        let bound = self.bound.lock().take();
        if let Some(bound) = bound {
            if let Err(e) = bound.close().await {
                tracing::warn!(error = %e, "transport close failed");
                first_err = Some(e);
            }
        }

        if let Err(e) = self.engine.close().await {
            tracing::warn!(error = %e, "dev-server engine close failed");
            first_err.get_or_insert(e);
        }

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
