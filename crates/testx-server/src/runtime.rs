//! Runtime utilites
//!
//! This module is only used by the binaries and provides helper code
//! related to runtime configuration.

mod config;
mod logging;

use std::path::{Path, PathBuf};

pub use config::Config;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logging::LogRotation;

/// Prefix of the environment variables read into the config
const ENV_PREFIX: &str = "TESTX_";

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Read configuration from environment variables only (when no config file is provided)
#[allow(clippy::result_large_err)]
pub fn read_config_from_env() -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .extract()
}

/// Read in a config from a YAML file, filling in any missing values from the environment
#[allow(clippy::result_large_err)]
pub fn read_config(yaml_path: impl AsRef<Path>) -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .join(Yaml::file(yaml_path))
        .extract()
}

/// Sets up either file logging or stderr logging depending on provided configuration options
pub fn setup_logging(config: &Config) -> Result<Option<WorkerGuard>, anyhow::Error> {
    let env_filter = config.logging.env_filter()?;

    if let Some(path) = &config.logging.path {
        setup_file_logging(path, env_filter, config.logging.rotation)
    } else {
        setup_stderr_logging(env_filter)
    }
}

/// Sets up rolling file appender logging but falls back to stderr logging on failure
fn setup_file_logging(
    log_path: &PathBuf,
    env_filter: EnvFilter,
    log_rotation: LogRotation,
) -> Result<Option<WorkerGuard>, anyhow::Error> {
    if std::fs::create_dir_all(log_path).is_err() {
        eprintln!("Could not build log path - falling back to stderr");
        return setup_stderr_logging(env_filter);
    }

    let (non_blocking_writer, guard) = match log_rotation.appender(log_path) {
        Ok(appender) => tracing_appender::non_blocking(appender),
        Err(_error) => {
            eprintln!("Log file setup failed - falling back to stderr");
            return setup_stderr_logging(env_filter);
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(Some(guard))
}

/// Sets up stderr logging
fn setup_stderr_logging(env_filter: EnvFilter) -> Result<Option<WorkerGuard>, anyhow::Error> {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false),
        )
        .try_init()?;

    Ok(None)
}

/// Resolves on Ctrl-C, or SIGTERM on unix
#[allow(clippy::expect_used)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod test {
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::Path;

    use super::{read_config, read_config_from_env};
    use tracing::Level;

    #[test]
    fn it_prioritizes_env_vars() {
        let config = r#"
            server:
                port: 4100
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("TESTX_SERVER__PORT", "4200");

            let config = read_config(path)?;

            assert_eq!(config.server.port, 4200);
            Ok(())
        });
    }

    #[test]
    fn it_merges_env_and_file() {
        let config = r#"
            schema: schema.graphql
            health_check:
                path: /up
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("TESTX_LOGGING__LEVEL", "debug");
            jail.set_env("TESTX_SERVER__ADDRESS", "0.0.0.0");

            let config = read_config(path)?;

            assert_eq!(config.schema.as_deref(), Some(Path::new("schema.graphql")));
            assert_eq!(config.health_check.path, "/up");
            assert!(config.health_check.enabled);
            assert_eq!(config.logging.level, Level::DEBUG);
            assert_eq!(
                config.server.address,
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            );
            Ok(())
        });
    }

    #[test]
    fn it_reads_env_without_a_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TESTX_SERVER__GRAPHQL_PATH", "/api");
            jail.set_env("TESTX_SERVER__CONTROL", "false");

            let options = read_config_from_env()?.server_options();

            assert_eq!(options.graphql_path, "/api");
            assert!(!options.control);
            assert_eq!(options.port, 4000);
            Ok(())
        });
    }

    #[test]
    fn it_rejects_unknown_levels() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TESTX_LOGGING__LEVEL", "loud");

            assert!(read_config_from_env().is_err());
            Ok(())
        });
    }
}
