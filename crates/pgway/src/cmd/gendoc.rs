//! Gendoc command
//!
//! Loads the route registry exactly as the server does and writes the
//! rendered Markdown API reference to the given path.

use anyhow::{Context, Result};
use clap::Args;
use pgway_config::Config;
use pgway_gateway::{render_documentation, Gateway};
use tracing::info;

#[derive(Args, Debug)]
pub struct GendocArgs {
    /// Destination file
    pub output_path: std::path::PathBuf,
}

pub async fn run(config: Config, args: GendocArgs) -> Result<()> {
    let gateway = Gateway::connect(&config)
        .await
        .context("connecting to PostgreSQL")?;

    let routes = gateway
        .load_routes()
        .await
        .context("loading route registry")?;

    let document = render_documentation(
        &routes,
        &config.protocol.filter_parameter,
        &config.protocol.sort_parameter,
        &config.protocol.limit_parameter,
    );

    std::fs::write(&args.output_path, document)
        .with_context(|| format!("writing {}", args.output_path.display()))?;

    info!(
        routes = routes.len(),
        output = %args.output_path.display(),
        "API reference generated"
    );
    Ok(())
}
