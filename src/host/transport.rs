//! Transport abstraction over the listening socket.
//!
//! A transport binds the router to a socket and hands back a
//! [`BoundTransport`] that owns the serve task. Implementations exist only
//! where the underlying socket API genuinely differs: TCP and (on Unix)
//! Unix domain sockets.

use crate::error::{HostError, Result};
use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Binds a router to a listening socket.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind and start serving.
    ///
    /// Resolves only once the socket is actually accepting connections, so
    /// callers can sequence readiness notifications after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    async fn bind(&self, app: Router) -> Result<BoundTransport>;
}

/// A bound, serving transport.
///
/// Owns the serve task and its shutdown signal. `close` is idempotent: the
/// first call stops accepting connections and awaits the serve task, repeat
/// calls are no-ops.
pub struct BoundTransport {
    local_addr: Option<SocketAddr>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: tokio::sync::Mutex<Option<JoinHandle<Result<()>>>>,
}

impl BoundTransport {
    pub(crate) fn new(
        local_addr: Option<SocketAddr>,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            local_addr,
            shutdown: Mutex::new(Some(shutdown)),
            task: tokio::sync::Mutex::new(Some(task)),
        }
    }

    /// The bound socket address, when the transport has one (TCP).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop accepting new connections and wait for the serve task to finish.
    ///
    /// # Errors
    ///
    /// Returns the serve task's error, if it failed. A second call returns
    /// `Ok(())` without doing anything.
    pub async fn close(&self) -> Result<()> {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }

        let handle = self.task.lock().await.take();
        match handle {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => Err(HostError::Server(format!("serve task panicked: {}", e))),
            },
            None => Ok(()),
        }
    }
}

/// TCP transport.
pub struct TcpTransport {
    addr: SocketAddr,
}

impl TcpTransport {
    /// Create a transport for a socket address.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn bind(&self, app: Router) -> Result<BoundTransport> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| HostError::Server(format!("failed to bind to {}: {}", self.addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| HostError::Server(format!("failed to read local address: {}", e)))?;

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .map_err(|e| HostError::Server(format!("server error: {}", e)))
        });

        Ok(BoundTransport::new(Some(local_addr), tx, task))
    }
}

/// Unix domain socket transport.
#[cfg(unix)]
pub struct UnixTransport {
    path: std::path::PathBuf,
}

#[cfg(unix)]
impl UnixTransport {
    /// Create a transport for a socket path.
    ///
    /// A stale socket file at the path is removed before binding.
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }
}

#[cfg(unix)]
#[async_trait]
impl Transport for UnixTransport {
    async fn bind(&self, app: Router) -> Result<BoundTransport> {
        use tokio::net::UnixListener;

        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await.map_err(|e| {
                HostError::Server(format!(
                    "failed to remove stale socket {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        let listener = UnixListener::bind(&self.path).map_err(|e| {
            HostError::Server(format!("failed to bind to {}: {}", self.path.display(), e))
        })?;

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .map_err(|e| HostError::Server(format!("server error: {}", e)))
        });

        Ok(BoundTransport::new(None, tx, task))
    }
}
