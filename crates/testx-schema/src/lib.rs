//! Library for turning a testx schema definition into a data model and the schemas derived
//! from it.
//!
//! A schema definition is plain GraphQL SDL listing the object types a test needs. Every object
//! type becomes an entity backed by a table. From the data model this crate generates:
//!
//! * a GraphQL API with a query, a list query and a count per entity, and create, update and
//!   delete mutations with a matching input type
//! * `CREATE TABLE` statements describing how the entities are stored
//!
//! Enums and custom scalars may be declared alongside the object types. Other type system
//! definitions are rejected.

pub mod database;
pub mod error;
pub mod graphql;
pub mod model;
pub mod naming;

pub use database::database_schema;
pub use error::SchemaError;
pub use graphql::Api;
pub use model::{DataModel, Entity, EnumType, Field, FieldKind, RootFieldKind, ScalarKind};
