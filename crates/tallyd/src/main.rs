//! tallyd - push-triggered code-quality webhook daemon
//!
//! Accepts forge webhooks, acknowledges them immediately, and runs the
//! analysis pipeline on a bounded worker pool in the background.

mod queue;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use tally_ci::Pipeline;
use tally_core::TallyConfig;

#[derive(Parser)]
#[command(name = "tallyd")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Code-quality webhook service", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "tally.toml", env = "TALLY_CONFIG")]
    config: PathBuf,

    /// Override the bind address from the config file
    #[arg(long)]
    addr: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tally_core::init_tracing(cli.json, level);

    let mut config = TallyConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(addr) = cli.addr {
        config.server.bind_addr = addr;
    }

    let pipeline = Arc::new(Pipeline::new(&config).context("failed to construct pipeline")?);

    server::serve(&config, pipeline).await
}
