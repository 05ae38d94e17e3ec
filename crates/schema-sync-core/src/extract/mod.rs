//! Schema extractors.
//!
//! Three sources converge on the same [`SchemaAst`] shape:
//!
//! - [`database`]: introspection of a live database through a
//!   [`DatabaseClient`];
//! - [`script`]: a `.surql` script of DEFINE statements;
//! - [`code`]: registered code-side [`Definition`](crate::model::Definition)s.
//!
//! Nested object fields become dotted paths (`address.city`) and
//! array/set elements become wildcard paths (`tags.*` or `tags[*]`).

pub mod code;
pub mod database;
pub mod script;

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{EventAst, FieldAst, IndexAst, TableAst};
use crate::parser::{
    DefinitionKind, ParseError, parse_event, parse_field, parse_index, parse_table, parse_target,
};
use crate::warnings::{Warning, WarningKind, Warnings};

pub use code::extract_code_schema;
pub use database::{DatabaseClient, DatabaseInfo, TableInfo, introspect};
pub use script::{extract_script, parse_script};

static DEFINE_KIND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*DEFINE\s+([A-Za-z]+)(?:\s+(?:OVERWRITE\s+|IF\s+NOT\s+EXISTS\s+)?([^\s;(]+))?")
        .expect("define pattern is a valid regex")
});

static GEOMETRY_SUBTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)geometry<[^>]*?\b(feature|multi\w*|collection)\b")
        .expect("geometry pattern is a valid regex")
});

/// One classified DEFINE statement.
#[derive(Debug)]
pub(crate) enum Statement {
    Table(TableAst),
    Field(String, FieldAst),
    Index(String, IndexAst),
    Event(String, EventAst),
    /// A DEFINE statement that is not modeled, e.g. `ANALYZER`, with the
    /// defined name.
    Unsupported(String, String),
    /// Anything that is not a DEFINE statement.
    Other,
}

fn owner(statement: &str, kind: DefinitionKind) -> Result<String, ParseError> {
    parse_target(statement)
        .filter(|(found, _)| *found == kind)
        .map(|(_, table)| table)
        .ok_or_else(|| ParseError::unexpected(kind, statement))
}

/// Parses one statement according to its DEFINE keyword.
pub(crate) fn classify(statement: &str) -> Result<Statement, ParseError> {
    let Some(caps) = DEFINE_KIND.captures(statement) else {
        return Ok(Statement::Other);
    };
    let keyword = caps[1].to_ascii_uppercase();
    Ok(match keyword.as_str() {
        "TABLE" => Statement::Table(parse_table(statement)?),
        "FIELD" => {
            let field = parse_field(statement)?;
            Statement::Field(owner(statement, DefinitionKind::Field)?, field)
        }
        "INDEX" => {
            let index = parse_index(statement)?;
            Statement::Index(owner(statement, DefinitionKind::Index)?, index)
        }
        "EVENT" => {
            let event = parse_event(statement)?;
            Statement::Event(owner(statement, DefinitionKind::Event)?, event)
        }
        _ => Statement::Unsupported(
            keyword,
            caps.get(2).map_or_else(String::new, |m| m.as_str().to_string()),
        ),
    })
}

/// Records a parse failure for `subject`.
pub(crate) fn parse_failure(warnings: &mut Warnings, subject: impl Into<String>, err: &ParseError) {
    warnings.push(
        Warning::new(WarningKind::ParseFailure, subject, err.to_string())
            .with_hint("The definition was skipped; check the statement syntax"),
    );
}

/// Adds a field to `table`, flagging geometry subtypes that are not modeled.
pub(crate) fn record_field(table: &mut TableAst, field: FieldAst, warnings: &mut Warnings) {
    if let Some(caps) = GEOMETRY_SUBTYPE.captures(&field.ty) {
        warnings.unsupported(
            format!("field {}.{}", table.name, field.name),
            format!("Geometry subtype '{}' is not modeled", &caps[1]),
            "The type is kept verbatim; review it after generation",
        );
    }
    table.add_field(field);
}

/// Adds an index to `table`, flagging detection-only index kinds.
pub(crate) fn record_index(table: &mut TableAst, index: IndexAst, warnings: &mut Warnings) {
    let subject = format!("index {}.{}", table.name, index.name);
    if index.vector {
        warnings.unsupported(
            subject,
            "Vector indexes (HNSW/MTREE) are not synchronized",
            "Define the index manually in a migration",
        );
    } else if index.search {
        warnings.unsupported(
            subject,
            "Full-text search indexes are not synchronized",
            "Define the analyzer and index manually in a migration",
        );
    }
    table.add_index(index);
}

/// Adds an event to `table`; events are captured but never diffed.
pub(crate) fn record_event(table: &mut TableAst, event: EventAst, warnings: &mut Warnings) {
    warnings.unsupported(
        format!("event {}.{}", table.name, event.name),
        "Events are captured but not synchronized",
        "Keep event definitions in hand-written migrations",
    );
    table.events.push(event);
}

/// Flags a DEFINE statement kind that has no schema model.
pub(crate) fn record_unsupported(warnings: &mut Warnings, keyword: &str, name: &str) {
    warnings.unsupported(
        format!("{} {name}", keyword.to_ascii_lowercase()),
        format!("DEFINE {keyword} statements are not synchronized"),
        "Manage them in hand-written migrations",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_dispatches_on_keyword() {
        assert!(matches!(
            classify("DEFINE TABLE user SCHEMAFULL").unwrap(),
            Statement::Table(t) if t.name == "user"
        ));
        assert!(matches!(
            classify("define field email on user type string").unwrap(),
            Statement::Field(table, f) if table == "user" && f.name == "email"
        ));
        assert!(matches!(
            classify("DEFINE ANALYZER simple TOKENIZERS blank").unwrap(),
            Statement::Unsupported(k, name) if k == "ANALYZER" && name == "simple"
        ));
        assert!(matches!(classify("USE NS test").unwrap(), Statement::Other));
    }

    #[test]
    fn classify_reports_malformed_statements() {
        let err = classify("DEFINE INDEX broken ON user").unwrap_err();
        assert!(matches!(err, ParseError::MissingColumns { .. }));
    }

    #[test]
    fn exotic_geometry_is_flagged_but_kept() {
        let mut table = TableAst::normal("place");
        let mut warnings = Warnings::new();
        record_field(
            &mut table,
            FieldAst::new("area", "geometry<multipolygon>"),
            &mut warnings,
        );
        record_field(&mut table, FieldAst::new("pin", "geometry<point>"), &mut warnings);
        assert_eq!(table.fields.len(), 2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn exotic_geometry_is_flagged_anywhere_in_a_union() {
        let mut table = TableAst::normal("place");
        let mut warnings = Warnings::new();
        record_field(
            &mut table,
            FieldAst::new("shape", "geometry<point | multipolygon>"),
            &mut warnings,
        );
        record_field(
            &mut table,
            FieldAst::new("route", "option<geometry<point|line>>"),
            &mut warnings,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings.iter().next().unwrap().to_string(),
            "field place.shape: Geometry subtype 'multipolygon' is not modeled (The type is kept verbatim; review it after generation)"
        );
    }
}
