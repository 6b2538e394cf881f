//! Logging infrastructure for the development host.
//!
//! Structured logging built on the `tracing` ecosystem with verbosity flags
//! and environment-based overrides.
//!
//! # Verbosity Levels
//!
//! The logging level is determined in this order:
//! 1. `--verbose` flag: DEBUG level for devhost
//! 2. `--quiet` flag: ERROR level only
//! 3. `RUST_LOG` environment variable: custom filter
//! 4. Default: INFO level for devhost

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the specified options.
///
/// Should be called once at the start of the program, before any logging
/// occurs.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging (overrides `quiet`)
/// * `quiet` - Only show error-level logs
/// * `no_color` - Disable colored output
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("devhost=debug")
    } else if quiet {
        EnvFilter::new("devhost=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devhost=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Initialize logger with a custom environment filter.
///
/// Useful for tests or advanced scenarios that need precise control over log
/// filtering.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
