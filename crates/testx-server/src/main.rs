use std::path::PathBuf;

use anyhow::{Context as _, anyhow};
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use serde_json::Value;
use testx_server::{TestxConfig, TestxServer};
use tracing::info;

mod runtime;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the testx server
#[derive(Debug, clap::Parser)]
#[command(
    styles = STYLES,
    about = "testx server - serve a mock GraphQL API generated from a schema definition",
)]
struct Args {
    /// Path to the YAML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Path to the GraphQL schema definition file, overriding the config
    #[arg(long, short = 's')]
    schema: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => runtime::read_config(path)?,
        None => runtime::read_config_from_env()?,
    };

    let _guard = runtime::setup_logging(&config)?;

    info!("testx server v{}", std::env!("CARGO_PKG_VERSION"));

    let schema_path = args
        .schema
        .or_else(|| config.schema.clone())
        .ok_or_else(|| anyhow!("No schema definition given, use --schema or set `schema` in the config"))?;
    let schema = tokio::fs::read_to_string(&schema_path)
        .await
        .with_context(|| format!("Failed to read schema file {}", schema_path.display()))?;

    let data = match &config.data {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read data file {}", path.display()))?;
            Some(
                serde_json::from_str::<Value>(&text)
                    .with_context(|| format!("Failed to parse data file {}", path.display()))?,
            )
        }
        None => None,
    };

    let mut server =
        TestxServer::with_options(TestxConfig { schema, data }, config.server_options());
    let address = server.start().await?;
    info!(%address, "testx server listening");

    runtime::shutdown_signal().await;
    server.shutdown().await;

    Ok(())
}
