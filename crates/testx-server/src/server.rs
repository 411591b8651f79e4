use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use enumset::EnumSet;
use serde_json::Value;
use tracing::info;

use crate::api::{ApiMethod, ApiSurface};
use crate::definition::SchemaDefinition;
use crate::errors::ServerError;
use crate::graphql::{GraphQLRequest, GraphQLResponse};
use crate::health::HealthCheckConfig;

mod states;

use states::{Configuring, State};

/// Options for serving the generated API over HTTP
#[derive(Debug, Clone, bon::Builder)]
pub struct ServerOptions {
    /// Address to listen on
    #[builder(default = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub address: IpAddr,

    /// Port to listen on. Zero picks a free port.
    #[builder(default)]
    pub port: u16,

    /// Path the GraphQL endpoint is served on
    #[builder(into, default = "/graphql".to_string())]
    pub graphql_path: String,

    #[builder(default)]
    pub health_check: HealthCheckConfig,

    /// Whether to serve the remote control routes
    #[builder(default = true)]
    pub control: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A GraphQL server generated from a schema definition, backed by in-memory data
///
/// A server moves from configuring, through bootstrapped and running, to closed. Dropping a
/// server stops it, so the listener and background task are released on every exit path.
pub struct TestxServer {
    options: ServerOptions,
    state: State,
}

impl TestxServer {
    pub fn new(definition: impl Into<SchemaDefinition>) -> Self {
        Self::with_options(definition, ServerOptions::default())
    }

    pub fn with_options(definition: impl Into<SchemaDefinition>, options: ServerOptions) -> Self {
        Self {
            options,
            state: Configuring::new(definition.into()).into(),
        }
    }

    /// Parse the schema definition and generate the API, database schema and seed data
    ///
    /// Bootstrapping an already bootstrapped server does nothing. A failed bootstrap leaves the
    /// server configuring, so it can be retried.
    pub async fn bootstrap(&mut self) -> Result<(), ServerError> {
        let bootstrapped = match &self.state {
            State::Configuring(configuring) => configuring.bootstrap()?,
            State::Bootstrapped(_) | State::Running(_) => return Ok(()),
            State::Closed => return Err(ServerError::Closed),
        };
        self.state = bootstrapped.into();
        Ok(())
    }

    /// Serve the API over HTTP, bootstrapping first if needed
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        self.bootstrap().await?;
        let running = match &self.state {
            State::Bootstrapped(bootstrapped) => bootstrapped.start(&self.options).await?,
            State::Running(running) => return Ok(running.address()),
            State::Configuring(_) => return Err(ServerError::NotBootstrapped),
            State::Closed => return Err(ServerError::Closed),
        };
        let address = running.address();
        self.state = running.into();
        Ok(address)
    }

    /// Stop serving and release everything the server holds
    ///
    /// The HTTP task finishes in the background. Use [`TestxServer::shutdown`] to wait for it.
    pub fn close(&mut self) {
        if !matches!(self.state, State::Closed) {
            info!("Closing testx server");
        }
        self.state = State::Closed;
    }

    /// Close the server and wait for the HTTP task to finish
    pub async fn shutdown(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Closed);
        if let State::Running(running) = state {
            info!("Shutting down testx server");
            running.stop().await;
        }
    }

    /// The address the server is listening on, while running
    pub fn address(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Running(running) => Some(running.address()),
            _ => None,
        }
    }

    pub async fn graphql_schema(&self) -> Result<String, ServerError> {
        Ok(self.state.backend()?.graphql_schema().to_string())
    }

    pub async fn database_schema(&self) -> Result<String, ServerError> {
        Ok(self.state.backend()?.database_schema().to_string())
    }

    /// Replace the data with rows of the shape `{ "Entity": [ {row}, ... ] }`
    pub async fn set_data(&self, data: &Value) -> Result<(), ServerError> {
        self.state.backend()?.set_data(data).await
    }

    pub async fn get_data(&self) -> Result<Value, ServerError> {
        Ok(self.state.backend()?.get_data().await)
    }

    /// Restore the data the server was bootstrapped with
    pub async fn reset_data(&self) -> Result<(), ServerError> {
        self.state.backend()?.reset_data().await;
        Ok(())
    }

    /// Run a GraphQL operation against the data, without going through HTTP
    pub async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse, ServerError> {
        Ok(self.state.backend()?.execute(request).await)
    }
}

impl ApiSurface for TestxServer {
    fn api_methods(&self) -> EnumSet<ApiMethod> {
        EnumSet::all()
    }
}
