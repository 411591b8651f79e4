use testx_schema::SchemaError;

/// An error in the data held by a server
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data must be an object keyed by entity name")]
    NotAnObject,

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Expected a list of rows for {0}")]
    InvalidRows(String),

    #[error("Expected an object for a row of {0}")]
    InvalidRow(String),

    #[error("Unknown field {field} on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Invalid value for {entity}.{field}: expected {expected}")]
    InvalidValue {
        entity: String,
        field: String,
        expected: String,
    },

    #[error("Missing value for required field {entity}.{field}")]
    MissingField { entity: String, field: String },

    #[error("Duplicate id {id} for {entity}")]
    DuplicateId { entity: String, id: String },
}

/// An error in server operation
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Invalid data: {0}")]
    Data(#[from] DataError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server has not been bootstrapped")]
    NotBootstrapped,

    #[error("Server has been closed")]
    Closed,

    #[error("Invalid route path {0}: paths must start with / and be distinct")]
    InvalidPath(String),

    #[error("Failed to bind server: {0}")]
    Bind(#[source] std::io::Error),
}
