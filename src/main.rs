//! Devhost entry point.
//!
//! Handles command-line parsing, logging initialization, server startup and
//! signal-driven shutdown.

use clap::Parser;
use devhost::host::{ServerLifecycle, TcpTransport, Transport};
use devhost::{cli, error, logger, ui, DevServerEngine, HostConfig, LocalDevServer, Result};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    run(args).await.map_err(error::host_error_to_miette)
}

async fn run(args: cli::Cli) -> Result<()> {
    let config = HostConfig::load(&args)?;
    config.validate()?;

    let engine = Arc::new(LocalDevServer::from_config(&config)?);
    let port = engine.port();

    let lifecycle = ServerLifecycle::new(
        Arc::clone(&engine) as Arc<dyn devhost::DevServerEngine>,
        config.entry.clone(),
        config.render_timeout(),
    );

    let transport: Box<dyn Transport> = match &config.socket_path {
        #[cfg(unix)]
        Some(path) => Box::new(devhost::host::UnixTransport::new(path.clone())),
        #[cfg(not(unix))]
        Some(_) => {
            return Err(devhost::HostError::Server(
                "Unix domain sockets are not supported on this platform".to_string(),
            ))
        }
        None => Box::new(TcpTransport::new(SocketAddr::from(([127, 0, 0, 1], port)))),
    };

    lifecycle.start(transport.as_ref()).await?;

    wait_for_shutdown_signal().await;

    ui::info("Shutting down...");
    lifecycle.stop().await?;
    ui::success("Server stopped");

    Ok(())
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
