//! Binary to print the GraphQL and database schemas generated from a schema definition file

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use testx_server::TestxServer;
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

/// Arguments to print-schema
#[derive(Debug, clap::Parser)]
#[command(about = "Print the GraphQL API and database schema generated from a schema definition")]
struct Args {
    /// Path to the GraphQL schema definition file
    schema_file: PathBuf,

    /// The log level, logs go to stderr
    #[arg(long = "log", short = 'l', default_value_t = Level::WARN)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let schema = tokio::fs::read_to_string(&args.schema_file)
        .await
        .with_context(|| format!("Failed to read schema file {}", args.schema_file.display()))?;
    debug!(path = %args.schema_file.display(), "Read schema definition");

    let mut server = TestxServer::new(schema);
    server.bootstrap().await?;

    println!("GraphQL Schema\n {}", server.graphql_schema().await?);
    println!("DB Schema\n {}", server.database_schema().await?);

    server.close();
    Ok(())
}
