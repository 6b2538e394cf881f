//! Local development engine.
//!
//! A self-contained engine that serves built client assets, renders server
//! fragments with minijinja and pushes live-reload events over SSE. It
//! implements the same collaborator surface an external engine would, so the
//! host treats both identically.

pub mod environments;
pub mod middleware;
pub mod reload;
pub mod state;
pub mod watcher;

use crate::config::HostConfig;
use crate::error::Result;
use crate::host::adapter::MiddlewareUnit;
use crate::host::engine::DevServerEngine;
use crate::host::render::{SsrEnvironment, WebEnvironment};
use crate::host::transport::BoundTransport;
use crate::ui;
use async_trait::async_trait;
use axum::Router;
use environments::{LocalSsrEnvironment, LocalWebEnvironment};
use middleware::StaticAssetMiddleware;
use state::{EngineState, ReloadEvent, SharedState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use watcher::{ReloadWatcher, WatchOptions};

/// The built-in development engine.
pub struct LocalDevServer {
    state: SharedState,
    middleware: Arc<dyn MiddlewareUnit>,
    ssr: Arc<dyn SsrEnvironment>,
    web: Arc<dyn WebEnvironment>,
    port: u16,
    server_url: String,
    open: bool,
    watch: WatchOptions,
    pump: tokio::sync::Mutex<Option<(ReloadWatcher, JoinHandle<()>)>>,
    closed: AtomicBool,
}

impl LocalDevServer {
    /// Build an engine from validated host configuration.
    ///
    /// Resolves the listen address up front so port conflicts surface before
    /// any resource is created.
    ///
    /// # Errors
    ///
    /// Returns an error if no port near the requested one is free.
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let (port, server_url) = match &config.socket_path {
            Some(path) => (0, format!("unix:{}", path.display())),
            None => {
                let addr = config.resolve_addr()?;
                (addr.port(), HostConfig::server_url(addr))
            }
        };

        let state: SharedState = Arc::new(EngineState::new(config.root.clone()));

        Ok(Self {
            middleware: Arc::new(StaticAssetMiddleware::new(Arc::clone(&state))),
            ssr: Arc::new(LocalSsrEnvironment::new(config.ssr_dir.clone())),
            web: Arc::new(LocalWebEnvironment::new(config.root.clone())),
            state,
            port,
            server_url,
            open: config.open,
            watch: WatchOptions {
                ignore: config.watch_ignore.clone(),
                debounce: config.debounce(),
            },
            pump: tokio::sync::Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Shared engine state, for tests and diagnostics.
    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

#[async_trait]
impl DevServerEngine for LocalDevServer {
    fn middlewares(&self) -> Arc<dyn MiddlewareUnit> {
        Arc::clone(&self.middleware)
    }

    fn ssr(&self) -> Arc<dyn SsrEnvironment> {
        Arc::clone(&self.ssr)
    }

    fn web(&self) -> Arc<dyn WebEnvironment> {
        Arc::clone(&self.web)
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn reload_router(&self) -> Router {
        reload::reload_router(Arc::clone(&self.state))
    }

    async fn after_listen(&self) {
        ui::success(&format!("Development server running at {}", self.server_url));
        ui::info("Press Ctrl+C to stop");

        if self.open {
            open_browser(&self.server_url);
        }
    }

    async fn connect_web_socket(&self, bound: &BoundTransport) -> Result<()> {
        tracing::debug!(addr = ?bound.local_addr(), "attaching live reload pump");

        let root = self.state.root.clone();
        let (watcher, mut rx) = ReloadWatcher::spawn(root.clone(), self.watch.clone())?;

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                let rel = path
                    .strip_prefix(&root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();

                tracing::debug!(path = %rel, "file changed, broadcasting reload");

                // Cached content is stale now.
                state.clear_cache();
                state.broadcast(&ReloadEvent::Reload { path: rel }).await;
            }
        });

        *self.pump.lock().await = Some((watcher, handle));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some((watcher, handle)) = self.pump.lock().await.take() {
            // Dropping the watcher ends the change stream, which lets the
            // pump task finish draining instead of being cut off mid-send.
            drop(watcher);
            handle.abort();
        }

        self.state.clear_clients();
        tracing::debug!("local engine closed");
        Ok(())
    }
}

/// Open the server URL in the default browser.
///
/// Uses platform-specific commands:
/// - macOS: `open`
/// - Windows: `start`
/// - Linux: `xdg-open`
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> HostConfig {
        let mut config = HostConfig::default_config();
        config.root = temp.path().to_path_buf();
        config.ssr_dir = temp.path().join("ssr");
        config.port = 0;
        config
    }

    #[tokio::test]
    async fn test_from_config_builds_engine() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("ssr")).unwrap();

        let engine = LocalDevServer::from_config(&config_in(&temp)).unwrap();
        assert_eq!(engine.state().root, temp.path());
        assert!(!engine.server_url.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let engine = LocalDevServer::from_config(&config_in(&temp)).unwrap();

        let (_id, _rx) = engine.state().register_client();

        engine.close().await.unwrap();
        assert_eq!(engine.state().client_count(), 0);

        engine.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unix_socket_config_skips_port_resolution() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.socket_path = Some(PathBuf::from("/tmp/devhost.sock"));

        let engine = LocalDevServer::from_config(&config).unwrap();
        assert_eq!(engine.port(), 0);
        assert!(engine.server_url.starts_with("unix:"));
    }
}
