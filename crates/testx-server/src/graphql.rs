//! Execute GraphQL operations against the store

use apollo_compiler::ast::{self, DirectiveList, OperationType};
use apollo_compiler::collections::IndexMap;
use apollo_compiler::executable::{
    ExecutableDocument, Field as SelectedField, Operation, Selection, SelectionSet,
};
use apollo_compiler::validation::Valid;
use apollo_compiler::{Node, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use testx_schema::graphql::{FIRST_ARGUMENT, INPUT_ARGUMENT, OFFSET_ARGUMENT};
use testx_schema::{DataModel, Entity, FieldKind, RootFieldKind};
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{Row, Store, id_value};

const TYPENAME_FIELD: &str = "__typename";

/// A GraphQL request, as posted by clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    /// Set the variables. Anything other than a JSON object clears them.
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = match variables {
            Value::Object(variables) => Some(variables),
            _ => None,
        };
        self
    }
}

/// An error reported in a GraphQL response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

/// A GraphQL response. `data` is null when the request could not be executed at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl GraphQLResponse {
    fn request_error(message: impl Into<String>) -> Self {
        Self {
            data: Value::Null,
            errors: vec![GraphQLError {
                message: message.into(),
                path: Vec::new(),
            }],
        }
    }
}

/// Execute a request. Failures are reported in the response rather than returned.
pub(crate) async fn execute(
    model: &DataModel,
    schema: &Valid<Schema>,
    store: &RwLock<Store>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let document =
        match ExecutableDocument::parse_and_validate(schema, request.query, "request.graphql") {
            Ok(document) => document,
            Err(errors) => {
                debug!("Rejected GraphQL document: {errors}");
                return GraphQLResponse::request_error(errors.to_string());
            }
        };

    let Ok(operation) = document
        .operations
        .get(request.operation_name.as_deref())
    else {
        return GraphQLResponse::request_error(match &request.operation_name {
            Some(name) => format!("Unknown operation named \"{name}\""),
            None => "Must provide operation name if query contains multiple operations".to_string(),
        });
    };

    let variables = match coerce_variables(operation, request.variables.unwrap_or_default()) {
        Ok(variables) => variables,
        Err(message) => return GraphQLResponse::request_error(message),
    };

    let mut execution = Execution {
        model,
        document: &document,
        variables,
        errors: Vec::new(),
    };
    let data = match operation.operation_type {
        OperationType::Query => {
            let store = store.read().await;
            execution.query(&operation.selection_set, &store)
        }
        OperationType::Mutation => execution.mutation(&operation.selection_set, store).await,
        OperationType::Subscription => {
            return GraphQLResponse::request_error("Subscriptions are not supported");
        }
    };

    GraphQLResponse {
        data: Value::Object(data),
        errors: execution.errors,
    }
}

/// Apply operation defaults to missing variables and check required ones are present and not null
fn coerce_variables(
    operation: &Operation,
    mut provided: Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut variables = Map::new();
    for definition in &operation.variables {
        let name = definition.name.as_str();
        match provided.remove(name) {
            Some(Value::Null) if definition.ty.is_non_null() => {
                return Err(format!(
                    "Variable ${name} of non-null type {} must not be null",
                    definition.ty
                ));
            }
            Some(value) => {
                variables.insert(name.to_string(), value);
            }
            None => match &definition.default_value {
                Some(default) => {
                    variables.insert(name.to_string(), value_to_json(default, &Map::new()));
                }
                None if definition.ty.is_non_null() => {
                    return Err(format!(
                        "Variable ${name} of required type {} was not provided",
                        definition.ty
                    ));
                }
                None => {}
            },
        }
    }
    Ok(variables)
}

/// Convert a literal argument value, substituting variables
fn value_to_json(value: &ast::Value, variables: &Map<String, Value>) -> Value {
    match value {
        ast::Value::Null => Value::Null,
        ast::Value::Enum(name) => Value::String(name.to_string()),
        ast::Value::Variable(name) => variables.get(name.as_str()).cloned().unwrap_or(Value::Null),
        ast::Value::String(text) => Value::String(text.to_string()),
        ast::Value::Float(float) => float
            .as_str()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ast::Value::Int(int) => int
            .as_str()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        ast::Value::Boolean(boolean) => Value::Bool(*boolean),
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| value_to_json(item, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value_to_json(value, variables)))
                .collect(),
        ),
    }
}

type FieldGroups<'a> = IndexMap<String, Vec<&'a Node<SelectedField>>>;

struct Execution<'a> {
    model: &'a DataModel,
    document: &'a ExecutableDocument,
    variables: Map<String, Value>,
    errors: Vec<GraphQLError>,
}

impl<'a> Execution<'a> {
    fn query(&mut self, selection_set: &'a SelectionSet, store: &Store) -> Map<String, Value> {
        let root_type = selection_set.ty.as_str();
        let mut data = Map::new();
        for (key, group) in self.field_groups(&[selection_set], root_type) {
            let path = vec![Value::String(key.clone())];
            let value = self.query_field(root_type, &group, &path, store);
            data.insert(key, self.or_error(value, path));
        }
        data
    }

    /// Mutation fields run one after another, each holding the store for writing
    async fn mutation(
        &mut self,
        selection_set: &'a SelectionSet,
        store: &RwLock<Store>,
    ) -> Map<String, Value> {
        let root_type = selection_set.ty.as_str();
        let mut data = Map::new();
        for (key, group) in self.field_groups(&[selection_set], root_type) {
            let path = vec![Value::String(key.clone())];
            let mut store = store.write().await;
            let value = self.mutation_field(root_type, &group, &path, &mut store);
            data.insert(key, self.or_error(value, path));
        }
        data
    }

    fn query_field(
        &mut self,
        root_type: &str,
        group: &[&'a Node<SelectedField>],
        path: &[Value],
        store: &Store,
    ) -> Result<Value, String> {
        let model = self.model;
        let Some(field) = group.first() else {
            return Ok(Value::Null);
        };
        let name = field.name.as_str();
        if name == TYPENAME_FIELD {
            return Ok(Value::String(root_type.to_string()));
        }
        if name.starts_with("__") {
            return Err("Introspection is not supported".to_string());
        }

        let (entity, kind) = model
            .root_field(name)
            .ok_or_else(|| format!("Unknown field {root_type}.{name}"))?;
        let arguments = self.arguments(field);
        let selections = selection_sets(group);

        match kind {
            RootFieldKind::Single => {
                let id = id_argument(&arguments)?;
                Ok(store
                    .table(&entity.name)
                    .and_then(|table| table.get(&id))
                    .map(|row| self.object(entity, row, &selections, path, store))
                    .unwrap_or(Value::Null))
            }
            RootFieldKind::List => {
                let offset = count_argument(&arguments, OFFSET_ARGUMENT)?.unwrap_or(0);
                let first = count_argument(&arguments, FIRST_ARGUMENT)?.unwrap_or(usize::MAX);
                let rows: Vec<&Row> = store
                    .table(&entity.name)
                    .into_iter()
                    .flat_map(|table| table.rows())
                    .skip(offset)
                    .take(first)
                    .collect();
                Ok(self.objects(entity, &rows, &selections, path, store))
            }
            RootFieldKind::Count => Ok(Value::from(
                store.table(&entity.name).map_or(0, |table| table.len()),
            )),
            RootFieldKind::Create | RootFieldKind::Update | RootFieldKind::Delete => {
                Err(format!("{name} is a mutation"))
            }
        }
    }

    fn mutation_field(
        &mut self,
        root_type: &str,
        group: &[&'a Node<SelectedField>],
        path: &[Value],
        store: &mut Store,
    ) -> Result<Value, String> {
        let model = self.model;
        let Some(field) = group.first() else {
            return Ok(Value::Null);
        };
        let name = field.name.as_str();
        if name == TYPENAME_FIELD {
            return Ok(Value::String(root_type.to_string()));
        }

        let (entity, kind) = model
            .root_field(name)
            .ok_or_else(|| format!("Unknown field {root_type}.{name}"))?;
        let arguments = self.arguments(field);
        let selections = selection_sets(group);

        match kind {
            RootFieldKind::Create => {
                let input = input_argument(&arguments)?;
                let row = store
                    .create(model, entity, &input)
                    .map_err(|e| e.to_string())?;
                debug!(entity = %entity.name, "Created row");
                Ok(self.object(entity, &row, &selections, path, store))
            }
            RootFieldKind::Update => {
                let id = id_argument(&arguments)?;
                let input = input_argument(&arguments)?;
                let row = store
                    .update(model, entity, &id, &input)
                    .map_err(|e| e.to_string())?;
                Ok(row
                    .map(|row| self.object(entity, &row, &selections, path, store))
                    .unwrap_or(Value::Null))
            }
            RootFieldKind::Delete => {
                let id = id_argument(&arguments)?;
                Ok(store
                    .delete(entity, &id)
                    .map(|row| self.object(entity, &row, &selections, path, store))
                    .unwrap_or(Value::Null))
            }
            RootFieldKind::Single | RootFieldKind::List | RootFieldKind::Count => {
                Err(format!("{name} is a query"))
            }
        }
    }

    fn objects(
        &mut self,
        entity: &'a Entity,
        rows: &[&Row],
        selections: &[&'a SelectionSet],
        path: &[Value],
        store: &Store,
    ) -> Value {
        Value::Array(
            rows.iter()
                .enumerate()
                .map(|(index, row)| {
                    let mut item_path = path.to_vec();
                    item_path.push(Value::from(index));
                    self.object(entity, row, selections, &item_path, store)
                })
                .collect(),
        )
    }

    fn object(
        &mut self,
        entity: &'a Entity,
        row: &Row,
        selections: &[&'a SelectionSet],
        path: &[Value],
        store: &Store,
    ) -> Value {
        let mut object = Map::new();
        for (key, group) in self.field_groups(selections, &entity.name) {
            let mut field_path = path.to_vec();
            field_path.push(Value::String(key.clone()));
            let value = self.entity_field(entity, row, &group, &field_path, store);
            object.insert(key, self.or_error(value, field_path));
        }
        Value::Object(object)
    }

    fn entity_field(
        &mut self,
        entity: &'a Entity,
        row: &Row,
        group: &[&'a Node<SelectedField>],
        path: &[Value],
        store: &Store,
    ) -> Result<Value, String> {
        let model = self.model;
        let Some(field) = group.first() else {
            return Ok(Value::Null);
        };
        let name = field.name.as_str();
        if name == TYPENAME_FIELD {
            return Ok(Value::String(entity.name.clone()));
        }

        let definition = entity
            .field(name)
            .ok_or_else(|| format!("Unknown field {}.{name}", entity.name))?;

        match &definition.kind {
            FieldKind::Reference(target) => {
                let target_entity = model
                    .entity(target)
                    .ok_or_else(|| format!("Unknown entity {target}"))?;
                let Some(id) = definition
                    .storage_key()
                    .and_then(|key| row.get(&key).and_then(Value::as_str).map(str::to_string))
                else {
                    return Ok(Value::Null);
                };
                match store.table(target).and_then(|table| table.get(&id)) {
                    Some(referenced) => Ok(self.object(
                        target_entity,
                        referenced,
                        &selection_sets(group),
                        path,
                        store,
                    )),
                    None if definition.non_null => {
                        Err(format!("{target} {id} referenced by {}.{name} does not exist", entity.name))
                    }
                    None => Ok(Value::Null),
                }
            }
            FieldKind::Collection { target, via } => {
                let target_entity = model
                    .entity(target)
                    .ok_or_else(|| format!("Unknown entity {target}"))?;
                let key = via
                    .as_deref()
                    .and_then(|via| target_entity.field(via))
                    .and_then(|via| via.storage_key());
                let (Some(key), Some(id)) = (key, row.get("id").and_then(Value::as_str)) else {
                    return Ok(Value::Array(Vec::new()));
                };
                let rows: Vec<&Row> = store.referencing(target, &key, id).collect();
                Ok(self.objects(target_entity, &rows, &selection_sets(group), path, store))
            }
            _ => Ok(definition
                .storage_key()
                .and_then(|key| row.get(&key).cloned())
                .unwrap_or(Value::Null)),
        }
    }

    /// Group the fields selected on `type_name` by response key, expanding fragments
    fn field_groups(&self, selection_sets: &[&'a SelectionSet], type_name: &str) -> FieldGroups<'a> {
        let mut groups = FieldGroups::default();
        for selection_set in selection_sets {
            self.collect_fields(selection_set, type_name, &mut groups);
        }
        groups
    }

    fn collect_fields(
        &self,
        selection_set: &'a SelectionSet,
        type_name: &str,
        groups: &mut FieldGroups<'a>,
    ) {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    if self.included(&field.directives) {
                        groups
                            .entry(field.response_key().to_string())
                            .or_default()
                            .push(field);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.included(&spread.directives) {
                        continue;
                    }
                    if let Some(fragment) = self.document.fragments.get(&spread.fragment_name)
                        && fragment.selection_set.ty.as_str() == type_name
                    {
                        self.collect_fields(&fragment.selection_set, type_name, groups);
                    }
                }
                Selection::InlineFragment(inline) => {
                    let applies = inline
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| condition.as_str() == type_name);
                    if applies && self.included(&inline.directives) {
                        self.collect_fields(&inline.selection_set, type_name, groups);
                    }
                }
            }
        }
    }

    /// Evaluate `@skip` and `@include`
    fn included(&self, directives: &DirectiveList) -> bool {
        let condition = |directive_name: &str| {
            directives
                .iter()
                .find(|directive| directive.name.as_str() == directive_name)
                .and_then(|directive| {
                    directive
                        .arguments
                        .iter()
                        .find(|argument| argument.name.as_str() == "if")
                })
                .map(|argument| value_to_json(&argument.value, &self.variables))
        };
        let skip = condition("skip").is_some_and(|value| value == Value::Bool(true));
        let include = condition("include").is_none_or(|value| value == Value::Bool(true));
        !skip && include
    }

    fn arguments(&self, field: &SelectedField) -> Map<String, Value> {
        field
            .arguments
            .iter()
            .map(|argument| {
                (
                    argument.name.to_string(),
                    value_to_json(&argument.value, &self.variables),
                )
            })
            .collect()
    }

    fn or_error(&mut self, value: Result<Value, String>, path: Vec<Value>) -> Value {
        value.unwrap_or_else(|message| {
            self.errors.push(GraphQLError { message, path });
            Value::Null
        })
    }
}

fn selection_sets<'a>(group: &[&'a Node<SelectedField>]) -> Vec<&'a SelectionSet> {
    group.iter().map(|field| &field.selection_set).collect()
}

fn id_argument(arguments: &Map<String, Value>) -> Result<String, String> {
    arguments
        .get("id")
        .and_then(id_value)
        .ok_or_else(|| "Argument id must be an ID".to_string())
}

fn count_argument(arguments: &Map<String, Value>, name: &str) -> Result<Option<usize>, String> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|count| usize::try_from(count).ok())
            .map(Some)
            .ok_or_else(|| format!("Argument {name} must not be negative")),
    }
}

fn input_argument(arguments: &Map<String, Value>) -> Result<Row, String> {
    arguments
        .get(INPUT_ARGUMENT)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| format!("Argument {INPUT_ARGUMENT} must be an object"))
}
