//! txrelay binary entry point.
//!
//! Usage:
//! ```bash
//! txrelay --config txrelay.toml
//! txrelay --port 9001 --socket /run/txrelay/tm.ipc
//! txrelay --help
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relay_enclave::{HttpPeerClient, MemoryEnclave, MemoryPartyDirectory};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use txrelay_server::config::Config;
use txrelay_server::gossip::spawn_gossip_task;
use txrelay_server::server::{Dispatcher, TransactionManager};

/// Privacy-preserving transaction relay.
#[derive(Parser, Debug)]
#[command(name = "txrelay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults are used if it does not exist)
    #[arg(long, default_value = "txrelay.toml")]
    config: PathBuf,

    /// Override the public listener port
    #[arg(long)]
    port: Option<u16>,

    /// Override the local IPC socket path
    #[arg(long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing::info!("txrelay v{}", env!("CARGO_PKG_VERSION"));

    let directory = Arc::new(MemoryPartyDirectory::new(
        config.directory.url.clone(),
        config.directory.peers.clone(),
    ));
    let peers = Arc::new(
        HttpPeerClient::new(Duration::from_secs(config.gossip.request_timeout_secs))
            .context("Failed to build peer client")?,
    );
    let enclave = Arc::new(MemoryEnclave::new(directory.clone(), peers.clone()));
    let manager = Arc::new(TransactionManager::new(enclave, directory.clone(), &config));

    // Both listeners must bind before anything is served
    let dispatcher = Dispatcher::bind(&config, manager)
        .await
        .context("Failed to start listeners")?;

    let gossip = spawn_gossip_task(directory, peers, config.gossip.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutting down...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                // Keep the sender alive so serving continues
                std::future::pending::<()>().await;
            }
        }
    });

    let result = dispatcher.run(shutdown_rx).await;
    gossip.abort();

    result.context("Listener failed")?;
    tracing::info!("Done.");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        tracing::info!(
            "Configuration file {} not found, using defaults",
            cli.config.display()
        );
        Config::default()
    };

    if let Some(port) = cli.port {
        config.set_network_port(port)?;
    }
    if let Some(socket) = &cli.socket {
        config.local.socket_path = socket.clone();
    }

    Ok(config)
}
