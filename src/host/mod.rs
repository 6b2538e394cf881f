//! Hosting layer for a dev-server engine.
//!
//! The host wraps an externally owned dev server in an HTTP pipeline:
//! callback-style middleware adapted to the async request path, SSR dispatch
//! for the root page with CSR fallback, and a lifecycle that sequences
//! startup and guarantees idempotent shutdown.

pub mod adapter;
pub mod engine;
pub mod lifecycle;
pub mod pipeline;
pub mod render;
pub mod transport;

pub use adapter::{ChainError, Continuation, MiddlewareAdapter, MiddlewareUnit, RawRequest, RawResponse};
pub use engine::DevServerEngine;
pub use lifecycle::ServerLifecycle;
pub use pipeline::build_router;
pub use render::{
    RenderDispatcher, RenderEntry, SsrEnvironment, WebEnvironment, APP_PLACEHOLDER, CUSTOM_HEADER,
};
#[cfg(unix)]
pub use transport::UnixTransport;
pub use transport::{BoundTransport, TcpTransport, Transport};
