//! pgway - PostgreSQL REST gateway
//!
//! # Usage
//!
//! ```bash
//! # Run the gateway
//! pgway --config pgway.toml serve
//!
//! # Generate the API reference from the live route registry
//! pgway --config pgway.toml gendoc api.md
//! ```

mod cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pgway_config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// PostgreSQL REST gateway driven by a database-resident route registry
#[derive(Parser, Debug)]
#[command(name = "pgway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the gateway
    Serve,

    /// Generate an API reference from the route registry
    Gendoc(cmd::gendoc::GendocArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let default_level = if config.system.verbose { "debug" } else { "info" };
    init_logging(cli.log_level.as_deref().unwrap_or(default_level))?;

    // worker count follows the config, so the runtime builds by hand
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.system.worker_threads.max(1))
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Command::Serve => cmd::serve::run(config).await,
            Command::Gendoc(args) => cmd::gendoc::run(config, args).await,
        }
    })
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}
