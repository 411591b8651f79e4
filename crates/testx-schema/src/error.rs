use apollo_compiler::{Schema, ast::Document, validation::WithErrors};

/// An error while building the data model or the schemas derived from it
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Could not parse GraphQL schema: {0}")]
    Parse(Box<WithErrors<Document>>),

    #[error("Generated GraphQL API is invalid: {0}")]
    Validation(Box<WithErrors<Schema>>),

    #[error("Unsupported definition in data model: {0}")]
    UnsupportedDefinition(String),

    #[error("Type name {0} is reserved for the generated API")]
    ReservedType(String),

    #[error("Unknown type {type_name} for field {entity}.{field}")]
    UnknownType {
        entity: String,
        field: String,
        type_name: String,
    },

    #[error("Duplicate definition: {0}")]
    Duplicate(String),

    #[error("Schema defines no entity types")]
    Empty,
}
