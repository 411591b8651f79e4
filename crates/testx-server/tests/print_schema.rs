use std::io::Write as _;
use std::process::Command;

use tempfile::NamedTempFile;

fn print_schema(path: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_print-schema"))
        .arg(path)
        .output()
        .unwrap()
}

#[test]
fn it_prints_both_schemas_in_order() {
    let mut schema_file = NamedTempFile::new().unwrap();
    writeln!(schema_file, "type User {{ id: ID! name: String }}").unwrap();

    let output = print_schema(schema_file.path());

    assert!(output.status.success(), "{output:?}");
    insta::assert_snapshot!(String::from_utf8(output.stdout).unwrap(), @r"
    GraphQL Schema
     type User {
      id: ID!
      name: String
    }

    input UserInput {
      id: ID
      name: String
    }

    type Query {
      user(id: ID!): User
      users(first: Int, offset: Int): [User!]!
      usersCount: Int!
    }

    type Mutation {
      createUser(input: UserInput!): User!
      updateUser(id: ID!, input: UserInput!): User
      deleteUser(id: ID!): User
    }

    DB Schema
     CREATE TABLE users (
      id TEXT NOT NULL PRIMARY KEY,
      name TEXT
    );
    ");
}

#[test]
fn it_prints_descriptions_that_need_escaping() {
    let mut schema_file = NamedTempFile::new().unwrap();
    writeln!(
        schema_file,
        r#""Say \"hi\"" type User {{ "Ends in \\" name: String }}"#
    )
    .unwrap();

    let output = print_schema(schema_file.path());

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("type User {"));
    assert!(stdout.contains("DB Schema\n CREATE TABLE users ("));
}

#[test]
fn it_fails_without_output_for_a_missing_file() {
    let directory = tempfile::tempdir().unwrap();

    let output = print_schema(&directory.path().join("missing.graphql"));

    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("GraphQL Schema"));
    assert!(!stdout.contains("DB Schema"));
    assert!(String::from_utf8(output.stderr).unwrap().contains("Failed to read schema file"));
}

#[test]
fn it_fails_without_output_for_an_invalid_schema() {
    let mut schema_file = NamedTempFile::new().unwrap();
    writeln!(schema_file, "interface Node {{ id: ID! }}").unwrap();

    let output = print_schema(schema_file.path());

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
