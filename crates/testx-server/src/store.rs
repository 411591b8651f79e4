//! In-memory storage for the rows of each entity

use apollo_compiler::collections::IndexMap;
use serde_json::{Map, Value};
use testx_schema::{DataModel, Entity, Field, FieldKind, ScalarKind};

use crate::errors::DataError;

/// A stored row, keyed by the storage key of each field
pub type Row = Map<String, Value>;

/// Whether a row must carry every required field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completeness {
    Complete,
    Partial,
}

/// Rows of a single entity, in insertion order, keyed by id
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: IndexMap<String, Row>,
}

impl Table {
    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest positive integer id, counting up from the row count, that is not taken
    fn next_id(&self) -> String {
        let mut candidate = self.rows.len() + 1;
        while self.rows.contains_key(candidate.to_string().as_str()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    fn insert(&mut self, entity: &str, mut row: Row) -> Result<Row, DataError> {
        let id = match row.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = self.next_id();
                row.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        if self.rows.contains_key(&id) {
            return Err(DataError::DuplicateId {
                entity: entity.to_string(),
                id,
            });
        }
        self.rows.insert(id, row.clone());
        Ok(row)
    }
}

/// Rows of every entity of a data model
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: IndexMap<String, Table>,
}

impl Store {
    /// An empty store with a table for each entity
    pub fn new(model: &DataModel) -> Self {
        Self {
            tables: model
                .entities()
                .map(|entity| (entity.name.clone(), Table::default()))
                .collect(),
        }
    }

    /// Build a store from JSON of the shape `{ "Entity": [ {row}, ... ] }`
    ///
    /// Entities missing from the data start out empty. Rows without an id are assigned one.
    pub fn load(model: &DataModel, data: &Value) -> Result<Self, DataError> {
        let entries = data.as_object().ok_or(DataError::NotAnObject)?;
        let mut store = Self::new(model);

        for (entity_name, rows) in entries {
            let entity = model
                .entity(entity_name)
                .ok_or_else(|| DataError::UnknownEntity(entity_name.clone()))?;
            let rows = rows
                .as_array()
                .ok_or_else(|| DataError::InvalidRows(entity_name.clone()))?;
            for row in rows {
                let row = row
                    .as_object()
                    .ok_or_else(|| DataError::InvalidRow(entity_name.clone()))?;
                store.create(model, entity, row)?;
            }
        }

        Ok(store)
    }

    pub fn table(&self, entity: &str) -> Option<&Table> {
        self.tables.get(entity)
    }

    /// The store contents in the same shape [`Store::load`] accepts
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.tables
                .iter()
                .map(|(name, table)| {
                    (
                        name.clone(),
                        Value::Array(table.rows().cloned().map(Value::Object).collect()),
                    )
                })
                .collect(),
        )
    }

    /// Insert a new row, checking it against the entity definition
    pub fn create(
        &mut self,
        model: &DataModel,
        entity: &Entity,
        input: &Row,
    ) -> Result<Row, DataError> {
        let row = check_row(model, entity, input, Completeness::Complete)?;
        self.tables
            .entry(entity.name.clone())
            .or_default()
            .insert(&entity.name, row)
    }

    /// Merge `input` into an existing row. Returns `None` when no row has the id.
    ///
    /// The id of a row never changes, so an id in the input is ignored.
    pub fn update(
        &mut self,
        model: &DataModel,
        entity: &Entity,
        id: &str,
        input: &Row,
    ) -> Result<Option<Row>, DataError> {
        let mut patch = check_row(model, entity, input, Completeness::Partial)?;
        patch.remove("id");

        let Some(row) = self
            .tables
            .get_mut(&entity.name)
            .and_then(|table| table.rows.get_mut(id))
        else {
            return Ok(None);
        };
        row.extend(patch);
        Ok(Some(row.clone()))
    }

    /// Remove a row, returning it
    pub fn delete(&mut self, entity: &Entity, id: &str) -> Option<Row> {
        self.tables
            .get_mut(&entity.name)
            .and_then(|table| table.rows.shift_remove(id))
    }

    /// Rows of `entity` whose stored `key` holds `id`
    pub fn referencing<'a>(
        &'a self,
        entity: &str,
        key: &'a str,
        id: &'a str,
    ) -> impl Iterator<Item = &'a Row> + 'a {
        self.table(entity)
            .into_iter()
            .flat_map(Table::rows)
            .filter(move |row| row.get(key).and_then(Value::as_str) == Some(id))
    }
}

fn check_row(
    model: &DataModel,
    entity: &Entity,
    row: &Row,
    completeness: Completeness,
) -> Result<Row, DataError> {
    let mut checked = Row::new();
    for (key, value) in row {
        let field = entity
            .field_by_storage_key(key)
            .ok_or_else(|| DataError::UnknownField {
                entity: entity.name.clone(),
                field: key.clone(),
            })?;
        checked.insert(key.clone(), check_value(model, entity, field, value)?);
    }

    if completeness == Completeness::Complete {
        let missing = entity.fields.values().find(|field| {
            field.non_null
                && field.kind != FieldKind::Id
                && field
                    .storage_key()
                    .is_some_and(|key| checked.get(&key).is_none_or(Value::is_null))
        });
        if let Some(field) = missing {
            return Err(DataError::MissingField {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    Ok(checked)
}

fn check_value(
    model: &DataModel,
    entity: &Entity,
    field: &Field,
    value: &Value,
) -> Result<Value, DataError> {
    let invalid = |expected: &str| DataError::InvalidValue {
        entity: entity.name.clone(),
        field: field.name.clone(),
        expected: expected.to_string(),
    };

    if value.is_null() {
        return if field.non_null {
            Err(invalid("a non-null value"))
        } else {
            Ok(Value::Null)
        };
    }

    match &field.kind {
        FieldKind::Id | FieldKind::Reference(_) => id_value(value)
            .map(Value::String)
            .ok_or_else(|| invalid("an ID")),
        FieldKind::Scalar(scalar) => {
            if let ScalarKind::Id = scalar {
                return id_value(value)
                    .map(Value::String)
                    .ok_or_else(|| invalid("an ID"));
            }
            matches_scalar(scalar, value)
                .then(|| value.clone())
                .ok_or_else(|| invalid(expectation(scalar)))
        }
        FieldKind::Enum(name) => matches_enum(model, name, value)
            .then(|| value.clone())
            .ok_or_else(|| invalid(&format!("a value of enum {name}"))),
        FieldKind::ScalarList(item) => {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(&format!("a list of {item}")))?;
            let all_match = items.iter().all(|element| {
                element.is_null()
                    || match model.enum_type(item) {
                        Some(_) => matches_enum(model, item, element),
                        None => matches_scalar(&scalar_kind(item), element),
                    }
            });
            all_match
                .then(|| value.clone())
                .ok_or_else(|| invalid(&format!("a list of {item}")))
        }
        FieldKind::Collection { .. } => Err(invalid("no value, collections are derived")),
    }
}

/// IDs are kept as strings, but integer input is accepted
pub(crate) fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}

fn scalar_kind(name: &str) -> ScalarKind {
    match name {
        "ID" => ScalarKind::Id,
        "String" => ScalarKind::String,
        "Int" => ScalarKind::Int,
        "Float" => ScalarKind::Float,
        "Boolean" => ScalarKind::Boolean,
        other => ScalarKind::Custom(other.to_string()),
    }
}

fn matches_scalar(scalar: &ScalarKind, value: &Value) -> bool {
    match scalar {
        ScalarKind::Id => id_value(value).is_some(),
        ScalarKind::String => value.is_string(),
        ScalarKind::Int => value
            .as_i64()
            .is_some_and(|int| i32::try_from(int).is_ok()),
        ScalarKind::Float => value.is_number(),
        ScalarKind::Boolean => value.is_boolean(),
        ScalarKind::Custom(_) => true,
    }
}

fn expectation(scalar: &ScalarKind) -> &'static str {
    match scalar {
        ScalarKind::Id => "an ID",
        ScalarKind::String => "a string",
        ScalarKind::Int => "a 32-bit integer",
        ScalarKind::Float => "a number",
        ScalarKind::Boolean => "a boolean",
        ScalarKind::Custom(_) => "any value",
    }
}

fn matches_enum(model: &DataModel, name: &str, value: &Value) -> bool {
    value.as_str().is_some_and(|text| {
        model
            .enum_type(name)
            .is_some_and(|enum_type| enum_type.values.iter().any(|v| v == text))
    })
}
