pub mod api;
mod backend;
pub mod definition;
pub mod errors;
pub mod graphql;
pub mod health;
mod http;
pub mod server;
pub mod store;
pub mod suite;

pub use api::{ApiMethod, ApiSurface, is_testx_api_method};
pub use definition::{SchemaDefinition, TestxConfig};
pub use server::{ServerOptions, TestxServer};
