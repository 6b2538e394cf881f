//! Command-line interface definition for the development host.
//!
//! Defines the CLI structure using clap v4's derive macros. The host is a
//! single-purpose command, so there are no subcommands: flags configure the
//! server directly and everything else comes from `devhost.config.json`.

use clap::Parser;
use std::path::PathBuf;

/// Devhost - a development host server with SSR and CSR fallback
#[derive(Parser, Debug)]
#[command(
    name = "devhost",
    version,
    about = "A development host server with server-side rendering and client-side fallback",
    long_about = "Devhost serves a page with server-side rendering on the root path and\n\
                  degrades gracefully to client-side rendering when rendering fails.\n\
                  Static assets and unknown paths are served by the dev-server\n\
                  middleware chain, with live reload on file changes."
)]
pub struct Cli {
    /// Port to listen on
    ///
    /// If the port is busy, the next available port (up to +10) is used
    /// instead. Defaults to 3000.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory containing the built client assets
    ///
    /// Served by the middleware chain for every non-root path, and the source
    /// of the HTML template for SSR. Defaults to "dist".
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Logical page entry to render
    ///
    /// Names both the server render fragment (<ssr_dir>/<entry>.html.j2) and
    /// the HTML template (<root>/<entry>.html). Defaults to "index".
    #[arg(long)]
    pub entry: Option<String>,

    /// Open the browser once the server is listening
    #[arg(long)]
    pub open: bool,

    /// Path to a configuration file
    ///
    /// Defaults to devhost.config.json in the current directory if present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind to a Unix domain socket instead of TCP
    #[arg(long, value_name = "PATH")]
    pub uds: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
