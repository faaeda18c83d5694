//! ISP Notify Hub
//!
//! Standalone WebSocket notification server for the ISP back-office.
//! Accepts portal client connections and fans ticket events out to them.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use isp_notify::config::{HubConfig, DEFAULT_CONFIG_FILE};
use isp_notify::notify::ConnectionRegistry;
use isp_notify::server::{NotifyServer, ServerConfig};

/// ISP Notify Hub
///
/// WebSocket notification fan-out for the back-office portals
#[derive(Parser, Debug)]
#[command(name = "isp-notify")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Path to the hub configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("ISP Notify Hub v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration and apply CLI overrides
    let mut hub_config = HubConfig::load(&args.config)?;
    if let Some(port) = args.port {
        hub_config.port = port;
    }
    if let Some(bind) = args.bind {
        hub_config.bind = bind;
    }

    let config = ServerConfig::new(hub_config.bind.clone(), hub_config.port)
        .with_bind_timeout(hub_config.bind_timeout());

    // One registry for the whole process, shared by the server sessions and
    // any in-process dispatcher consumers
    let registry = Arc::new(ConnectionRegistry::new());
    let server = Arc::new(NotifyServer::new(config, registry));
    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    // Run the server
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
