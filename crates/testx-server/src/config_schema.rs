//! Prints the JSON Schema of the testx server YAML config, for editor completion

#![allow(unused_imports, dead_code)]

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use schemars::schema_for;

mod runtime;

/// Arguments to the config schema printer
#[derive(Debug, clap::Parser)]
#[command(about = "Print the JSON Schema of the testx server config")]
struct Args {
    /// Write the schema to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let schema = serde_json::to_string_pretty(&schema_for!(runtime::Config))
        .context("Failed to serialize the config schema")?;

    match &args.output {
        Some(path) => std::fs::write(path, schema + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{schema}"),
    }
    Ok(())
}
