//! Error types for the development host.
//!
//! This module provides a hierarchical error type system using `thiserror` for
//! structured error handling. The taxonomy mirrors the failure semantics of
//! the host pipeline:
//!
//! - **`RenderError`** - SSR failures. These are recovered locally by the
//!   render dispatcher: logged, then the request falls through to the adapted
//!   middleware chain. Never surfaced to the client as an error response.
//! - **`HostError::Middleware`** - the adapted middleware chain invoked its
//!   continuation with an error. Propagated to the pipeline, which maps it to
//!   a plain 500 response.
//! - **`ConfigError`** plus transport/bind failures - fatal at startup; the
//!   process must not report ready with a partial server listening.
//! - Shutdown failures are best-effort: one resource's close failure never
//!   prevents attempting to close the other.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the development host.
///
/// This is the primary error type returned by the lifecycle and pipeline. It
/// automatically converts from domain-specific errors via `From`
/// implementations.
#[derive(Debug, Error)]
pub enum HostError {
    /// Configuration-related errors (file not found, invalid values, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server-side rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The adapted middleware chain failed (continuation called with an error,
    /// or the middleware violated its completion contract)
    #[error("Middleware chain error: {0}")]
    Middleware(String),

    /// Transport and serving errors (bind failures, serve task errors)
    #[error("Server error: {0}")]
    Server(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
///
/// These errors occur during config loading and validation. Each variant
/// provides specific guidance on what went wrong.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create a devhost.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Server-side rendering errors.
///
/// Any of these aborts the SSR attempt for the current request; the render
/// dispatcher catches them at its boundary and hands the request to the
/// adapted middleware chain (the CSR degraded path).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The compiled server bundle could not be loaded
    #[error("Failed to load server bundle '{name}': {message}")]
    BundleLoad {
        /// Logical page name requested from the SSR environment
        name: String,
        /// Underlying failure description
        message: String,
    },

    /// The bundle loaded but its render entry point failed
    #[error("Render entry failed: {0}")]
    Render(String),

    /// The transformed HTML template could not be fetched
    #[error("Failed to fetch transformed template '{name}': {message}")]
    TemplateFetch {
        /// Logical page name requested from the web environment
        name: String,
        /// Underlying failure description
        message: String,
    },

    /// The template does not contain the content placeholder
    #[error("Template is missing the '<!--app-content-->' placeholder")]
    PlaceholderMissing,

    /// The SSR attempt exceeded the configured render timeout
    #[error("Server render timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias using `HostError` as the default error type.
pub type Result<T, E = HostError> = std::result::Result<T, E>;

/// Convert a `HostError` to a miette `Report` for terminal error reporting.
pub fn host_error_to_miette(err: HostError) -> miette::Report {
    match err {
        HostError::Config(e) => miette::miette!("Configuration error: {}", e),
        HostError::Server(msg) => miette::miette!("Server error: {}", msg),
        other => miette::miette!("{}", other),
    }
}
