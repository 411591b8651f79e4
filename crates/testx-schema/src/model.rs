//! The data model described by a testx schema definition

use std::path::Path;

use apollo_compiler::ast::{Definition, Document, FieldDefinition, Type};
use apollo_compiler::collections::{IndexMap, IndexSet};
use apollo_compiler::parser::Parser;
use apollo_compiler::Node;
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::naming::{lower_camel, pluralize, snake_case, table_name};

/// Scalars that need no declaration in the schema definition
pub const BUILT_IN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

/// Type names taken by the generated API
pub const RESERVED_TYPES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// Name of the primary key field on every entity
pub const ID_FIELD: &str = "id";

/// The kind of scalar backing a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    Float,
    Boolean,
    Custom(String),
}

impl ScalarKind {
    fn from_name(name: &str, custom: &IndexSet<String>) -> Option<Self> {
        match name {
            "ID" => Some(ScalarKind::Id),
            "String" => Some(ScalarKind::String),
            "Int" => Some(ScalarKind::Int),
            "Float" => Some(ScalarKind::Float),
            "Boolean" => Some(ScalarKind::Boolean),
            other => custom
                .contains(other)
                .then(|| ScalarKind::Custom(other.to_string())),
        }
    }
}

/// How a field of an entity is stored and resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// The primary key
    Id,

    /// A single scalar value
    Scalar(ScalarKind),

    /// A single enum value
    Enum(String),

    /// A list of scalar or enum values, stored as JSON
    ScalarList(String),

    /// A single other entity, stored as a foreign key
    Reference(String),

    /// A list of other entities, resolved through the first reference on the target entity
    /// that points back at the owner
    Collection {
        target: String,
        via: Option<String>,
    },
}

/// A field of an entity
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    /// The declared GraphQL type, as written in the schema definition
    pub ty: String,
    pub non_null: bool,
    pub kind: FieldKind,
}

impl Field {
    /// Key under which the field value is kept in a stored row
    pub fn storage_key(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Reference(_) => Some(format!("{}Id", self.name)),
            FieldKind::Collection { .. } => None,
            _ => Some(self.name.clone()),
        }
    }

    /// Column name in the database schema
    pub fn column_name(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Reference(_) => Some(format!("{}_id", snake_case(&self.name))),
            FieldKind::Collection { .. } => None,
            _ => Some(snake_case(&self.name)),
        }
    }
}

/// Names of the generated API fields for an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFields {
    pub single: String,
    pub list: String,
    pub count: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub input: String,
}

impl RootFields {
    fn for_entity(name: &str) -> Self {
        let list = lower_camel(&pluralize(name));
        Self {
            single: lower_camel(name),
            count: format!("{list}Count"),
            list,
            create: format!("create{name}"),
            update: format!("update{name}"),
            delete: format!("delete{name}"),
            input: format!("{name}Input"),
        }
    }
}

/// An object type of the data model, backed by a table
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub description: Option<String>,
    pub table: String,
    pub root_fields: RootFields,
    pub fields: IndexMap<String, Field>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Find the field whose stored key is `key`
    pub fn field_by_storage_key(&self, key: &str) -> Option<&Field> {
        self.fields
            .values()
            .find(|field| field.storage_key().as_deref() == Some(key))
    }
}

/// An enum type of the data model
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

/// The data model parsed from a schema definition
#[derive(Debug, Clone, Default)]
pub struct DataModel {
    entities: IndexMap<String, Entity>,
    enums: IndexMap<String, EnumType>,
    scalars: IndexSet<String>,
}

impl DataModel {
    /// Parse a schema definition into a data model
    pub fn parse(source: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let document = Parser::new()
            .parse_ast(source, path)
            .map_err(|e| SchemaError::Parse(Box::new(e)))?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &Document) -> Result<Self, SchemaError> {
        let mut model = DataModel::default();
        let mut objects = Vec::new();
        let mut declared: IndexSet<String> = Default::default();

        for definition in &document.definitions {
            let name = match definition {
                Definition::ObjectTypeDefinition(object) => {
                    if !object.implements_interfaces.is_empty() {
                        return Err(SchemaError::UnsupportedDefinition(format!(
                            "type {} implements interfaces",
                            object.name
                        )));
                    }
                    objects.push(object.clone());
                    object.name.to_string()
                }
                Definition::EnumTypeDefinition(enum_type) => {
                    let name = enum_type.name.to_string();
                    model.enums.insert(
                        name.clone(),
                        EnumType {
                            name: name.clone(),
                            description: description(&enum_type.description),
                            values: enum_type
                                .values
                                .iter()
                                .map(|value| value.value.to_string())
                                .collect(),
                        },
                    );
                    name
                }
                Definition::ScalarTypeDefinition(scalar) => {
                    let name = scalar.name.to_string();
                    model.scalars.insert(name.clone());
                    name
                }
                other => return Err(SchemaError::UnsupportedDefinition(describe(other))),
            };

            if RESERVED_TYPES.contains(&name.as_str()) {
                return Err(SchemaError::ReservedType(name));
            }
            if BUILT_IN_SCALARS.contains(&name.as_str()) || !declared.insert(name.clone()) {
                return Err(SchemaError::Duplicate(name));
            }
        }

        if objects.is_empty() {
            return Err(SchemaError::Empty);
        }

        let entity_names: IndexSet<String> =
            objects.iter().map(|object| object.name.to_string()).collect();

        for object in &objects {
            let entity_name = object.name.to_string();
            let mut fields: IndexMap<String, Field> = Default::default();
            for definition in &object.fields {
                let field = model.field(&entity_name, definition, &entity_names)?;
                if fields.contains_key(&field.name) {
                    return Err(SchemaError::Duplicate(format!(
                        "{entity_name}.{}",
                        field.name
                    )));
                }
                fields.insert(field.name.clone(), field);
            }

            if !fields.contains_key(ID_FIELD) {
                debug!(entity = %entity_name, "adding implicit id field");
                let mut with_id: IndexMap<String, Field> = Default::default();
                with_id.insert(
                    ID_FIELD.to_string(),
                    Field {
                        name: ID_FIELD.to_string(),
                        description: None,
                        ty: "ID!".to_string(),
                        non_null: true,
                        kind: FieldKind::Id,
                    },
                );
                with_id.extend(fields);
                fields = with_id;
            }

            model.entities.insert(
                entity_name.clone(),
                Entity {
                    table: table_name(&entity_name),
                    root_fields: RootFields::for_entity(&entity_name),
                    description: description(&object.description),
                    name: entity_name,
                    fields,
                },
            );
        }

        model.link_collections();
        Ok(model)
    }

    fn field(
        &self,
        entity: &str,
        definition: &Node<FieldDefinition>,
        entities: &IndexSet<String>,
    ) -> Result<Field, SchemaError> {
        let name = definition.name.to_string();
        if !definition.arguments.is_empty() {
            return Err(SchemaError::UnsupportedDefinition(format!(
                "arguments on field {entity}.{name}"
            )));
        }

        let ty = &definition.ty;
        let named = ty.inner_named_type().as_str();
        let is_list = matches!(ty, Type::List(_) | Type::NonNullList(_));

        let kind = if name == ID_FIELD {
            if named != "ID" || is_list {
                return Err(SchemaError::UnsupportedDefinition(format!(
                    "field {entity}.{name} must be of type ID!"
                )));
            }
            FieldKind::Id
        } else if entities.contains(named) {
            if is_list {
                FieldKind::Collection {
                    target: named.to_string(),
                    via: None,
                }
            } else {
                FieldKind::Reference(named.to_string())
            }
        } else if self.enums.contains_key(named)
            || ScalarKind::from_name(named, &self.scalars).is_some()
        {
            match (is_list, ScalarKind::from_name(named, &self.scalars)) {
                (true, _) => FieldKind::ScalarList(named.to_string()),
                (false, Some(scalar)) => FieldKind::Scalar(scalar),
                (false, None) => FieldKind::Enum(named.to_string()),
            }
        } else {
            return Err(SchemaError::UnknownType {
                entity: entity.to_string(),
                field: name,
                type_name: named.to_string(),
            });
        };

        let (ty, non_null) = if kind == FieldKind::Id {
            ("ID!".to_string(), true)
        } else {
            (ty.to_string(), ty.is_non_null())
        };

        Ok(Field {
            name,
            description: description(&definition.description),
            ty,
            non_null,
            kind,
        })
    }

    /// Resolve which reference each collection field is joined through
    fn link_collections(&mut self) {
        let back_references: Vec<(String, String, Option<String>)> = self
            .entities
            .values()
            .flat_map(|owner| {
                owner.fields.values().filter_map(|field| match &field.kind {
                    FieldKind::Collection { target, .. } => {
                        let via = self.entities.get(target).and_then(|target| {
                            target
                                .fields
                                .values()
                                .find(|candidate| {
                                    candidate.kind == FieldKind::Reference(owner.name.clone())
                                })
                                .map(|candidate| candidate.name.clone())
                        });
                        Some((owner.name.clone(), field.name.clone(), via))
                    }
                    _ => None,
                })
            })
            .collect();

        for (owner, field, via) in back_references {
            if via.is_none() {
                warn!(
                    entity = %owner,
                    field = %field,
                    "collection has no reference back to its owner and will always be empty"
                );
            }
            if let Some(FieldKind::Collection { via: slot, .. }) = self
                .entities
                .get_mut(&owner)
                .and_then(|entity| entity.fields.get_mut(&field))
                .map(|field| &mut field.kind)
            {
                *slot = via;
            }
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn scalars(&self) -> impl Iterator<Item = &str> {
        self.scalars.iter().map(String::as_str)
    }

    /// Find the entity owning a generated root field, with the kind of that field
    pub fn root_field(&self, field_name: &str) -> Option<(&Entity, RootFieldKind)> {
        self.entities.values().find_map(|entity| {
            let fields = &entity.root_fields;
            let kind = if field_name == fields.single {
                RootFieldKind::Single
            } else if field_name == fields.list {
                RootFieldKind::List
            } else if field_name == fields.count {
                RootFieldKind::Count
            } else if field_name == fields.create {
                RootFieldKind::Create
            } else if field_name == fields.update {
                RootFieldKind::Update
            } else if field_name == fields.delete {
                RootFieldKind::Delete
            } else {
                return None;
            };
            Some((entity, kind))
        })
    }
}

/// The generated root fields of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFieldKind {
    Single,
    List,
    Count,
    Create,
    Update,
    Delete,
}

fn description(description: &Option<Node<str>>) -> Option<String> {
    description.as_ref().map(|text| text.to_string())
}

fn describe(definition: &Definition) -> String {
    match definition {
        Definition::InterfaceTypeDefinition(def) => format!("interface {}", def.name),
        Definition::UnionTypeDefinition(def) => format!("union {}", def.name),
        Definition::InputObjectTypeDefinition(def) => format!("input {}", def.name),
        Definition::DirectiveDefinition(def) => format!("directive @{}", def.name),
        Definition::SchemaDefinition(_) => "schema definition".to_string(),
        Definition::OperationDefinition(_) | Definition::FragmentDefinition(_) => {
            "executable definition".to_string()
        }
        _ => "type extension".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        scalar DateTime

        enum Role {
            ADMIN
            MEMBER
        }

        "A person using the blog"
        type User {
            id: ID!
            name: String
            role: Role!
            posts: [Post!]!
        }

        type Post {
            title: String!
            tags: [String!]
            publishedAt: DateTime
            author: User
        }
    "#;

    #[test]
    fn it_parses_entities_in_declaration_order() {
        let model = DataModel::parse(SCHEMA, "schema.graphql").unwrap();

        let names: Vec<_> = model.entities().map(|entity| entity.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Post"]);
        assert_eq!(
            model.entity("User").unwrap().description.as_deref(),
            Some("A person using the blog")
        );
    }

    #[test]
    fn it_adds_a_missing_id_field_first() {
        let model = DataModel::parse(SCHEMA, "schema.graphql").unwrap();
        let post = model.entity("Post").unwrap();

        let first = post.fields.values().next().unwrap();
        assert_eq!(first.name, "id");
        assert_eq!(first.kind, FieldKind::Id);
        assert_eq!(first.ty, "ID!");
    }

    #[test]
    fn it_classifies_fields() {
        let model = DataModel::parse(SCHEMA, "schema.graphql").unwrap();
        let user = model.entity("User").unwrap();
        let post = model.entity("Post").unwrap();

        assert_eq!(
            user.field("name").unwrap().kind,
            FieldKind::Scalar(ScalarKind::String)
        );
        assert_eq!(
            user.field("role").unwrap().kind,
            FieldKind::Enum("Role".to_string())
        );
        assert_eq!(
            post.field("tags").unwrap().kind,
            FieldKind::ScalarList("String".to_string())
        );
        assert_eq!(
            post.field("publishedAt").unwrap().kind,
            FieldKind::Scalar(ScalarKind::Custom("DateTime".to_string()))
        );
        assert_eq!(
            post.field("author").unwrap().kind,
            FieldKind::Reference("User".to_string())
        );
        assert_eq!(
            user.field("posts").unwrap().kind,
            FieldKind::Collection {
                target: "Post".to_string(),
                via: Some("author".to_string()),
            }
        );
    }

    #[test]
    fn it_maps_storage_keys_and_columns() {
        let model = DataModel::parse(SCHEMA, "schema.graphql").unwrap();
        let post = model.entity("Post").unwrap();
        let author = post.field("author").unwrap();

        assert_eq!(author.storage_key().as_deref(), Some("authorId"));
        assert_eq!(author.column_name().as_deref(), Some("author_id"));
        assert_eq!(
            post.field("publishedAt").unwrap().column_name().as_deref(),
            Some("published_at")
        );
        assert_eq!(
            post.field_by_storage_key("authorId").map(|f| f.name.as_str()),
            Some("author")
        );
    }

    #[test]
    fn it_names_root_fields() {
        let model = DataModel::parse("type Category { name: String }", "schema.graphql").unwrap();
        let category = model.entity("Category").unwrap();

        assert_eq!(category.table, "categories");
        assert_eq!(
            category.root_fields,
            RootFields {
                single: "category".to_string(),
                list: "categories".to_string(),
                count: "categoriesCount".to_string(),
                create: "createCategory".to_string(),
                update: "updateCategory".to_string(),
                delete: "deleteCategory".to_string(),
                input: "CategoryInput".to_string(),
            }
        );
        assert!(matches!(
            model.root_field("categoriesCount"),
            Some((_, RootFieldKind::Count))
        ));
        assert!(model.root_field("categoryCount").is_none());
    }

    #[test]
    fn it_rejects_reserved_types() {
        let result = DataModel::parse("type Query { users: [String] }", "schema.graphql");
        assert!(matches!(result, Err(SchemaError::ReservedType(name)) if name == "Query"));
    }

    #[test]
    fn it_rejects_unknown_types() {
        let result = DataModel::parse("type User { avatar: Image }", "schema.graphql");
        assert!(matches!(
            result,
            Err(SchemaError::UnknownType { entity, field, type_name })
                if entity == "User" && field == "avatar" && type_name == "Image"
        ));
    }

    #[test]
    fn it_rejects_unsupported_definitions() {
        let result = DataModel::parse(
            "interface Node { id: ID! } type User { id: ID! }",
            "schema.graphql",
        );
        assert!(matches!(
            result,
            Err(SchemaError::UnsupportedDefinition(description)) if description == "interface Node"
        ));
    }

    #[test]
    fn it_rejects_duplicates() {
        let result = DataModel::parse("type User { id: ID! } type User { id: ID! }", "a.graphql");
        assert!(matches!(result, Err(SchemaError::Duplicate(name)) if name == "User"));

        let result = DataModel::parse("type User { name: String name: Int }", "a.graphql");
        assert!(matches!(result, Err(SchemaError::Duplicate(name)) if name == "User.name"));
    }

    #[test]
    fn it_rejects_a_non_id_primary_key() {
        let result = DataModel::parse("type User { id: Int! }", "schema.graphql");
        assert!(matches!(result, Err(SchemaError::UnsupportedDefinition(_))));
    }

    #[test]
    fn it_rejects_schemas_without_entities() {
        let result = DataModel::parse("enum Role { ADMIN }", "schema.graphql");
        assert!(matches!(result, Err(SchemaError::Empty)));
    }

    #[test]
    fn it_reports_syntax_errors() {
        let result = DataModel::parse("type User {", "schema.graphql");
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }
}
