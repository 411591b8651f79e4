//! Generation of the GraphQL API served for a data model

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;

use crate::error::SchemaError;
use crate::model::{DataModel, Entity, FieldKind};

/// Arguments accepted by the list query of every entity
pub const FIRST_ARGUMENT: &str = "first";
pub const OFFSET_ARGUMENT: &str = "offset";

/// Argument holding the values for create and update mutations
pub const INPUT_ARGUMENT: &str = "input";

/// Path reported in diagnostics for the generated API
const API_PATH: &str = "testx-api.graphql";

/// The GraphQL API generated for a data model
#[derive(Debug, Clone)]
pub struct Api {
    sdl: String,
    schema: Valid<Schema>,
}

impl Api {
    /// Generate and validate the API for a data model
    #[allow(clippy::result_large_err)]
    pub fn generate(model: &DataModel) -> Result<Self, SchemaError> {
        let schema = Schema::parse_and_validate(api_sdl(model), API_PATH)
            .map_err(|e| SchemaError::Validation(Box::new(e)))?;
        Ok(Self {
            sdl: schema.to_string(),
            schema,
        })
    }

    /// The validated API printed as SDL, without built-in definitions
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// The validated API schema
    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn into_parts(self) -> (String, Valid<Schema>) {
        (self.sdl, self.schema)
    }
}

/// Render the source of the API for a data model: user types first, then the input types and
/// roots
pub fn api_sdl(model: &DataModel) -> String {
    let mut blocks = Vec::new();

    for scalar in model.scalars() {
        blocks.push(format!("scalar {scalar}"));
    }

    for enum_type in model.enums() {
        let values: String = enum_type
            .values
            .iter()
            .map(|value| format!("  {value}\n"))
            .collect();
        blocks.push(format!(
            "{}enum {} {{\n{values}}}",
            described(enum_type.description.as_deref(), ""),
            enum_type.name
        ));
    }

    for entity in model.entities() {
        blocks.push(object_type(entity));
        blocks.push(input_type(entity));
    }

    blocks.push(root_type("Query", model.entities().flat_map(query_fields)));
    blocks.push(root_type(
        "Mutation",
        model.entities().flat_map(mutation_fields),
    ));

    let mut sdl = blocks.join("\n\n");
    sdl.push('\n');
    sdl
}

fn object_type(entity: &Entity) -> String {
    let mut block = described(entity.description.as_deref(), "");
    block.push_str(&format!("type {} {{\n", entity.name));
    for field in entity.fields.values() {
        block.push_str(&described(field.description.as_deref(), "  "));
        block.push_str(&format!("  {}: {}\n", field.name, field.ty));
    }
    block.push('}');
    block
}

/// The input type lists every stored field as nullable. Creation checks required fields itself
/// so that the same input serves partial updates.
fn input_type(entity: &Entity) -> String {
    let mut block = format!("input {} {{\n", entity.root_fields.input);
    for field in entity.fields.values() {
        let line = match &field.kind {
            FieldKind::Id => Some(format!("{}: ID", field.name)),
            FieldKind::Reference(_) => field
                .storage_key()
                .map(|key| format!("{key}: ID")),
            FieldKind::Collection { .. } => None,
            FieldKind::Scalar(_) | FieldKind::Enum(_) | FieldKind::ScalarList(_) => Some(format!(
                "{}: {}",
                field.name,
                field.ty.strip_suffix('!').unwrap_or(&field.ty)
            )),
        };
        if let Some(line) = line {
            block.push_str(&format!("  {line}\n"));
        }
    }
    block.push('}');
    block
}

fn query_fields(entity: &Entity) -> Vec<String> {
    let names = &entity.root_fields;
    let name = &entity.name;
    vec![
        format!("{}(id: ID!): {name}", names.single),
        format!(
            "{}({FIRST_ARGUMENT}: Int, {OFFSET_ARGUMENT}: Int): [{name}!]!",
            names.list
        ),
        format!("{}: Int!", names.count),
    ]
}

fn mutation_fields(entity: &Entity) -> Vec<String> {
    let names = &entity.root_fields;
    let name = &entity.name;
    vec![
        format!(
            "{}({INPUT_ARGUMENT}: {}!): {name}!",
            names.create, names.input
        ),
        format!(
            "{}(id: ID!, {INPUT_ARGUMENT}: {}!): {name}",
            names.update, names.input
        ),
        format!("{}(id: ID!): {name}", names.delete),
    ]
}

fn root_type(name: &str, fields: impl Iterator<Item = String>) -> String {
    let fields: String = fields.map(|field| format!("  {field}\n")).collect();
    format!("type {name} {{\n{fields}}}")
}

/// A description as a GraphQL string literal, escaped by the compiler's own serializer
fn described(description: Option<&str>, indent: &str) -> String {
    match description {
        Some(text) => format!("{indent}{}\n", ast::Value::String(text.to_string())),
        None => String::new(),
    }
}
