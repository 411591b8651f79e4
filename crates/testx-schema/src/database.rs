//! Relational schema matching the data model

use crate::model::{DataModel, Entity, Field, FieldKind, ScalarKind};

/// Render the `CREATE TABLE` statements for every entity, in declaration order
pub fn database_schema(model: &DataModel) -> String {
    model
        .entities()
        .map(|entity| create_table(model, entity))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn create_table(model: &DataModel, entity: &Entity) -> String {
    let columns: Vec<String> = entity
        .fields
        .values()
        .filter_map(|field| column(model, field))
        .collect();

    format!(
        "CREATE TABLE {} (\n  {}\n);",
        entity.table,
        columns.join(",\n  ")
    )
}

fn column(model: &DataModel, field: &Field) -> Option<String> {
    let name = field.column_name()?;
    let not_null = if field.non_null { " NOT NULL" } else { "" };
    let definition = match &field.kind {
        FieldKind::Id => "TEXT NOT NULL PRIMARY KEY".to_string(),
        FieldKind::Scalar(scalar) => format!("{}{not_null}", scalar_type(scalar)),
        FieldKind::Enum(enum_name) => {
            let values = model
                .enum_type(enum_name)
                .map(|enum_type| {
                    enum_type
                        .values
                        .iter()
                        .map(|value| format!("'{value}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("TEXT{not_null} CHECK ({name} IN ({values}))")
        }
        FieldKind::ScalarList(_) => format!("JSON{not_null}"),
        FieldKind::Reference(target) => {
            let table = model
                .entity(target)
                .map(|entity| entity.table.as_str())
                .unwrap_or(target.as_str());
            format!("TEXT{not_null} REFERENCES {table} (id)")
        }
        FieldKind::Collection { .. } => return None,
    };
    Some(format!("{name} {definition}"))
}

fn scalar_type(scalar: &ScalarKind) -> &'static str {
    match scalar {
        ScalarKind::Id | ScalarKind::String | ScalarKind::Custom(_) => "TEXT",
        ScalarKind::Int => "INTEGER",
        ScalarKind::Float => "REAL",
        ScalarKind::Boolean => "BOOLEAN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_renders_a_single_table() {
        let model =
            DataModel::parse("type User { id: ID! name: String }", "schema.graphql").unwrap();

        insta::assert_snapshot!(database_schema(&model), @r"
        CREATE TABLE users (
          id TEXT NOT NULL PRIMARY KEY,
          name TEXT
        );
        ");
    }

    #[test]
    fn it_renders_relations_enums_and_lists() {
        let model = DataModel::parse(
            r#"
            scalar DateTime
            enum Status { DRAFT PUBLISHED }
            type Author {
                fullName: String!
                posts: [BlogPost!]!
            }
            type BlogPost {
                title: String!
                views: Int
                rating: Float
                pinned: Boolean!
                status: Status!
                tags: [String]
                publishedAt: DateTime
                author: Author
            }
            "#,
            "schema.graphql",
        )
        .unwrap();

        insta::assert_snapshot!(database_schema(&model), @r"
        CREATE TABLE authors (
          id TEXT NOT NULL PRIMARY KEY,
          full_name TEXT NOT NULL
        );

        CREATE TABLE blog_posts (
          id TEXT NOT NULL PRIMARY KEY,
          title TEXT NOT NULL,
          views INTEGER,
          rating REAL,
          pinned BOOLEAN NOT NULL,
          status TEXT NOT NULL CHECK (status IN ('DRAFT', 'PUBLISHED')),
          tags JSON,
          published_at TEXT,
          author_id TEXT REFERENCES authors (id)
        );
        ");
    }
}
