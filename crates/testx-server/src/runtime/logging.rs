//! The `logging` section of the server config

mod parsers;
mod rotation;

pub(super) use rotation::LogRotation;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging related options
#[derive(Debug, Deserialize, JsonSchema)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(default = "default_level", deserialize_with = "parsers::by_name")]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// The directory to write log files to. Logs go to stderr when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How often to start a new log file, when logging to files
    #[serde(default, deserialize_with = "parsers::by_name")]
    pub rotation: LogRotation,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
            path: None,
            rotation: LogRotation::default(),
        }
    }
}

impl Logging {
    /// Filter from `RUST_LOG`, with the configured level added on top
    pub fn env_filter(&self) -> Result<EnvFilter, anyhow::Error> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(self.level.into());

        if self.level == Level::INFO {
            env_filter = env_filter.add_directive("tower_http=warn".parse()?);
        }
        Ok(env_filter)
    }
}

const fn default_level() -> Level {
    Level::INFO
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    // This is just an intermediate type to auto create schema information for,
    // so it is OK if it is never used
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}
