use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::Deserialize;
use testx_server::health::HealthCheckConfig;
use testx_server::server::ServerOptions;

use super::logging::Logging;

/// Configuration for the testx server
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Path to the GraphQL schema definition file
    pub schema: Option<PathBuf>,

    /// Path to a JSON file of seed data, keyed by entity name
    pub data: Option<PathBuf>,

    /// Health check configuration
    pub health_check: HealthCheckConfig,

    /// Logging configuration
    pub logging: Logging,

    /// HTTP server configuration
    pub server: ServerConfig,
}

impl Config {
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions::builder()
            .address(self.server.address)
            .port(self.server.port)
            .graphql_path(self.server.graphql_path.clone())
            .health_check(self.health_check.clone())
            .control(self.server.control)
            .build()
    }
}

/// Where and how the API is served
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// The IP address to bind to
    pub address: IpAddr,

    /// The port to bind to
    pub port: u16,

    /// The path of the GraphQL endpoint
    pub graphql_path: String,

    /// Serve the /testx/{method} control routes
    pub control: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4000,
            graphql_path: "/graphql".to_string(),
            control: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    #[test]
    fn it_parses_a_minimal_config() {
        serde_json::from_str::<Config>("{}").unwrap();
    }

    #[test]
    fn it_contains_no_keys_with_double_underscore() {
        // The env provider splits nested keys on __, so no field name may contain it.
        // See [runtime::read_config]
        let schema = schemars::schema_for!(Config).to_value().to_string();

        assert!(!schema.contains("__"))
    }
}
