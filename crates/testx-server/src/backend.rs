use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use serde_json::Value;
use testx_schema::{Api, DataModel, database_schema};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::definition::SchemaDefinition;
use crate::errors::ServerError;
use crate::graphql::{self, GraphQLRequest, GraphQLResponse};
use crate::store::Store;

/// Everything derived from a schema definition, plus the live data
pub(crate) struct Backend {
    model: DataModel,
    schema: Valid<Schema>,
    graphql_schema: String,
    database_schema: String,
    seed: Store,
    store: RwLock<Store>,
}

impl Backend {
    pub fn new(definition: &SchemaDefinition) -> Result<Self, ServerError> {
        let model = DataModel::parse(definition.sdl(), "schema.graphql")?;
        let (graphql_schema, schema) = Api::generate(&model)?.into_parts();
        let database_schema = database_schema(&model);
        let seed = match definition.data() {
            Some(data) => Store::load(&model, data)?,
            None => Store::new(&model),
        };

        debug!("Generated GraphQL API:\n{graphql_schema}");
        info!(
            entities = model.entities().count(),
            "Bootstrapped data model"
        );

        Ok(Self {
            model,
            schema,
            graphql_schema,
            database_schema,
            store: RwLock::new(seed.clone()),
            seed,
        })
    }

    pub fn graphql_schema(&self) -> &str {
        &self.graphql_schema
    }

    pub fn database_schema(&self) -> &str {
        &self.database_schema
    }

    /// Replace the data. Invalid data leaves the current data untouched.
    pub async fn set_data(&self, data: &Value) -> Result<(), ServerError> {
        let store = Store::load(&self.model, data)?;
        *self.store.write().await = store;
        Ok(())
    }

    pub async fn get_data(&self) -> Value {
        self.store.read().await.to_json()
    }

    /// Restore the data the server was bootstrapped with
    pub async fn reset_data(&self) {
        *self.store.write().await = self.seed.clone();
    }

    pub async fn execute(&self, request: GraphQLRequest) -> GraphQLResponse {
        graphql::execute(&self.model, &self.schema, &self.store, request).await
    }
}
