use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::definition::SchemaDefinition;
use crate::errors::ServerError;

use super::Bootstrapped;

pub(crate) struct Configuring {
    definition: SchemaDefinition,
}

impl Configuring {
    pub(crate) fn new(definition: SchemaDefinition) -> Self {
        Self { definition }
    }

    pub(crate) fn bootstrap(&self) -> Result<Bootstrapped, ServerError> {
        debug!("Bootstrapping from schema definition:\n{}", self.definition.sdl());
        let backend = Backend::new(&self.definition)?;
        Ok(Bootstrapped::new(Arc::new(backend)))
    }
}
