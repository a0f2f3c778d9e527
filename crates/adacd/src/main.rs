//! ADAC node controller daemon
//!
//! Serves the start/degree control routes and runs at most one consensus job
//! at a time.

use adac_common::{NodeConfig, DEFAULT_CONFIG_PATH};
use adacd::{logging, server, AppState, NodeContext};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "adacd", version, about = "Per-node consensus controller")]
struct Cli {
    /// Path to the node configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Validate the configuration, print this node's neighbors and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = NodeConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    logging::init(&config.logging)?;
    info!("[BOOT] adacd v{} starting", env!("CARGO_PKG_VERSION"));

    let self_address = config
        .node_runner
        .resolve_self_address()
        .context("Failed to determine this node's address")?;
    info!("[BOOT] Node address: {}", self_address);

    let node = NodeContext::from_config(&config, self_address)?;

    match node.neighbors() {
        Ok(neighbors) => info!("[BOOT] {} neighbors: {:?}", neighbors.len(), neighbors),
        Err(e) => warn!("[BOOT] {}; consensus jobs will fail until the topology lists this node", e),
    }

    if cli.check {
        let neighbors = node.neighbors()?;
        let degree = node.graph.degree(&node.self_address)?;
        println!("node:      {}", node.self_address);
        println!("degree:    {}", degree);
        println!("neighbors: {}", neighbors.join(", "));
        return Ok(());
    }

    server::run(
        AppState::new(node),
        &config.node_runner.host,
        config.node_runner.port,
    )
    .await
}
