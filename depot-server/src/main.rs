//! `depot` binary: load the configuration, set up logging, serve.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use depot_server::{run_server, Config};
use tracing::info;

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "Self-hosted artifact repository gateway")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log every request and mapped route
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let _guard = depot_logging::init_subscriber(&config.log_settings(cli.verbose));
    info!(version = env!("CARGO_PKG_VERSION"), "Depot");

    run_server(config, cli.config, cli.verbose).await?;

    info!("Bye!");
    Ok(())
}
