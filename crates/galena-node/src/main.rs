//! Galena node - a pedagogical proof-of-work chain node.
//!
//! This is the main entry point for the galena-node binary.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod node;
mod shell;

use config::NodeConfig;
use node::Node;

/// Galena proof-of-work chain node.
#[derive(Parser, Debug)]
#[command(name = "galena-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "galena.toml")]
    config: PathBuf,

    /// Node mode (full, light, boot)
    #[arg(short, long)]
    mode: Option<String>,

    /// Network listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Maximum peer connections
    #[arg(long)]
    max_peers: Option<usize>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration, then initialize logging from it.
    let config = NodeConfig::load(&args.config, &args)?;

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting galena node v{}", env!("CARGO_PKG_VERSION"));
    info!(mode = %config.mode, listen = %config.listen_addr, "configuration loaded");

    let node = Node::new(config);
    node.run().await
}
