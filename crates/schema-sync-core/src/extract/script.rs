//! Schema extraction from a SurrealQL script.

use tracing::debug;

use crate::ast::SchemaAst;
use crate::error::{Result, SyncError};
use crate::parser::{DefinitionKind, split_statements};
use crate::warnings::{Warning, WarningKind, Warnings};

use super::{
    Statement, classify, parse_failure, record_event, record_field, record_index,
    record_unsupported,
};

/// Reads every DEFINE statement of `script` into a schema.
///
/// Tables are collected first, so fields and indexes may appear before the
/// table they belong to. Malformed statements and definitions on unknown
/// tables are skipped with a warning; non-DEFINE statements are ignored.
#[must_use]
pub fn extract_script(script: &str) -> (SchemaAst, Warnings) {
    let mut warnings = Warnings::new();
    let mut statements = Vec::new();
    for (position, statement) in split_statements(script).iter().enumerate() {
        match classify(statement) {
            Ok(parsed) => statements.push(parsed),
            Err(err) => parse_failure(&mut warnings, format!("statement {}", position + 1), &err),
        }
    }

    let mut schema = SchemaAst::new();
    let mut children = Vec::new();
    for statement in statements {
        match statement {
            Statement::Table(table) => schema.add_table(table),
            Statement::Unsupported(keyword, name) => {
                record_unsupported(&mut warnings, &keyword, &name);
            }
            Statement::Other => debug!("Ignoring non-DEFINE statement"),
            child => children.push(child),
        }
    }

    for child in children {
        let (kind, table_name, name) = match &child {
            Statement::Field(table, field) => (DefinitionKind::Field, table, &field.name),
            Statement::Index(table, index) => (DefinitionKind::Index, table, &index.name),
            Statement::Event(table, event) => (DefinitionKind::Event, table, &event.name),
            _ => continue,
        };
        let Some(table) = schema.table_mut(table_name) else {
            warnings.push(Warning::new(
                WarningKind::StructuralMismatch,
                format!("{} {table_name}.{name}", kind.to_string().to_ascii_lowercase()),
                format!("Table '{table_name}' is not defined in the script"),
            ));
            continue;
        };
        match child {
            Statement::Field(_, field) => record_field(table, field, &mut warnings),
            Statement::Index(_, index) => record_index(table, index, &mut warnings),
            Statement::Event(_, event) => record_event(table, event, &mut warnings),
            _ => {}
        }
    }

    (schema, warnings)
}

/// Strict variant of [`extract_script`].
///
/// Unsupported DEFINE kinds are still ignored, but detection-only details
/// produce no warnings here.
///
/// # Errors
///
/// Returns [`SyncError::Parse`] for the first malformed statement and
/// [`SyncError::OrphanDefinition`] for a definition on an undefined table.
pub fn parse_script(script: &str) -> Result<SchemaAst> {
    let mut schema = SchemaAst::new();
    let mut children = Vec::new();
    for statement in split_statements(script) {
        match classify(&statement)? {
            Statement::Table(table) => schema.add_table(table),
            Statement::Unsupported(..) | Statement::Other => {}
            child => children.push(child),
        }
    }

    for child in children {
        let (kind, table_name, name) = match &child {
            Statement::Field(table, field) => (DefinitionKind::Field, table, &field.name),
            Statement::Index(table, index) => (DefinitionKind::Index, table, &index.name),
            Statement::Event(table, event) => (DefinitionKind::Event, table, &event.name),
            _ => continue,
        };
        let table = schema
            .table_mut(table_name)
            .ok_or_else(|| SyncError::OrphanDefinition {
                kind,
                name: name.clone(),
                table: table_name.clone(),
            })?;
        match child {
            Statement::Field(_, field) => table.add_field(field),
            Statement::Index(_, index) => table.add_index(index),
            Statement::Event(_, event) => table.events.push(event),
            _ => {}
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "
        -- users
        DEFINE FIELD email ON TABLE user TYPE string ASSERT string::is::email($value);
        DEFINE TABLE user TYPE NORMAL SCHEMAFULL PERMISSIONS FULL;
        DEFINE INDEX idx_email ON TABLE user FIELDS email UNIQUE;
        DEFINE ANALYZER simple TOKENIZERS blank;
        DEFINE FIELD title ON TABLE post TYPE string;
    ";

    #[test]
    fn lenient_extraction_collects_warnings() {
        let (schema, warnings) = extract_script(SCRIPT);
        let user = schema.table("user").unwrap();
        assert_eq!(user.fields.len(), 1);
        assert!(user.index("idx_email").unwrap().unique);
        assert_eq!(warnings.of_kind(WarningKind::StructuralMismatch).count(), 1);
        assert_eq!(warnings.of_kind(WarningKind::UnsupportedFeature).count(), 1);
    }

    #[test]
    fn strict_parse_rejects_orphans() {
        let err = parse_script(SCRIPT).unwrap_err();
        assert!(matches!(
            err,
            SyncError::OrphanDefinition { ref table, .. } if table == "post"
        ));
    }

    #[test]
    fn strict_parse_rejects_malformed_statements() {
        let err = parse_script("DEFINE TABLE user; DEFINE INDEX idx ON user;").unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }
}
