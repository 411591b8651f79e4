use serde::Deserialize;
use serde_json::Value;

/// Configuration object for constructing a server
#[derive(Debug, Clone, Deserialize)]
pub struct TestxConfig {
    /// The schema definition as GraphQL SDL
    pub schema: String,

    /// Rows loaded into the store on bootstrap and restored on reset, keyed by entity name
    #[serde(default)]
    pub data: Option<Value>,
}

/// The input a server is constructed from
#[derive(Debug, Clone)]
pub enum SchemaDefinition {
    /// Raw schema definition text
    Sdl(String),

    /// A configuration object holding the schema definition
    Config(TestxConfig),
}

impl SchemaDefinition {
    pub fn sdl(&self) -> &str {
        match self {
            SchemaDefinition::Sdl(sdl) => sdl,
            SchemaDefinition::Config(config) => &config.schema,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            SchemaDefinition::Sdl(_) => None,
            SchemaDefinition::Config(config) => config.data.as_ref(),
        }
    }
}

impl From<&str> for SchemaDefinition {
    fn from(sdl: &str) -> Self {
        SchemaDefinition::Sdl(sdl.to_string())
    }
}

impl From<String> for SchemaDefinition {
    fn from(sdl: String) -> Self {
        SchemaDefinition::Sdl(sdl)
    }
}

impl From<TestxConfig> for SchemaDefinition {
    fn from(config: TestxConfig) -> Self {
        SchemaDefinition::Config(config)
    }
}
