//! Devhost - a development host server with SSR and CSR fallback.
//!
//! The host serves a single page with server-side rendering on the root path
//! and degrades to client-side rendering when the render fails. Static assets
//! and every other path are handled by the dev server's middleware chain,
//! adapted from its callback contract into the async pipeline. Live reload
//! events are pushed to connected clients over Server-Sent Events.
//!
//! The crate is organized in two layers:
//!
//! - [`host`] - the hosting pipeline: middleware adaptation, SSR dispatch,
//!   transports and the server lifecycle. Engine-agnostic; everything it
//!   needs from a dev server is behind [`host::DevServerEngine`].
//! - [`local`] - the built-in engine: asset serving, minijinja render
//!   fragments and a file watcher driving the reload stream.

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod local;
pub mod logger;
pub mod ui;

pub use config::HostConfig;
pub use error::{ConfigError, HostError, RenderError, Result};
pub use host::{DevServerEngine, ServerLifecycle};
pub use local::LocalDevServer;
