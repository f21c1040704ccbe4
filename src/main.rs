//! Peerchat - Peer-to-Peer Command-Line Chat
//!
//! Each running instance is simultaneously a TCP server accepting inbound
//! peers and a client that can dial out to other instances.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peerchat::{
    command::CommandExecutor, config::ConfigManager, connection::Listener, connection::PeerTable,
    console, ShutdownCoordinator,
};

/// CLI arguments for peerchat
#[derive(Parser, Debug)]
#[command(name = "peerchat")]
#[command(about = "Peer-to-peer command-line chat")]
#[command(version)]
#[command(long_about = "
Peer-to-peer command-line chat over raw TCP.

Every instance listens for inbound peers on the given port and can dial out
to other instances with the interactive `connect` command.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  PEERCHAT_MAX_CONNECTIONS  - Maximum simultaneous connections
  PEERCHAT_BUFFER_SIZE      - Receive buffer size in bytes
  PEERCHAT_SHUTDOWN_TIMEOUT - Shutdown wait (e.g. 10s, 1m)
")]
pub struct CliArgs {
    /// Port the instance listens on for inbound peers
    pub port: u16,

    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Maximum number of simultaneous connections
    #[arg(long, help = "Maximum number of simultaneous connections")]
    pub max_connections: Option<usize>,

    /// Receive buffer size in bytes
    #[arg(long, help = "Receive buffer size in bytes")]
    pub buffer_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };
    config.merge_with_cli_args(args.port, args.max_connections, args.buffer_size);
    config.validate().context("configuration validation failed")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let table = PeerTable::from_config(&config, events_tx);

    // Bind before anything else; the process cannot operate without its
    // listening socket.
    let listener = Listener::bind(Arc::clone(&table), config.server.listen_port)
        .await
        .context("failed to start listener")?;
    println!("Server is listening on port: {}", config.server.listen_port);

    let coordinator = ShutdownCoordinator::new();
    let listener_handle = tokio::spawn(listener.run(coordinator.subscribe()));
    let printer_handle = tokio::spawn(console::print_events(events_rx));

    let executor = CommandExecutor::new(Arc::clone(&table), config.server.listen_port);
    tokio::select! {
        result = executor.run() => result?,
        _ = coordinator.listen_for_signals() => {
            // The signal path skips the REPL's own teardown; drain here instead.
            executor.close_all().await;
        }
    }

    coordinator.initiate();
    match timeout(config.server.shutdown_timeout, listener_handle).await {
        Ok(Ok(result)) => {
            if let Err(e) = result {
                error!("listener error: {e:#}");
            }
        }
        Ok(Err(e)) => error!("listener task failed: {e}"),
        Err(_) => warn!(
            "listener did not stop within {:?}",
            config.server.shutdown_timeout
        ),
    }
    printer_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging. Diagnostics go to stderr so the chat console
/// on stdout stays clean.
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    Ok(())
}
