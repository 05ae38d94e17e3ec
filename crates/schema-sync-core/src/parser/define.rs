//! DEFINE TABLE / FIELD / INDEX / EVENT statements.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{EventAst, FieldAst, IndexAst, TableAst, TableKind};

use super::clauses::{clause, clean, find_keyword, has_keyword, parse_permissions};
use super::error::{DefinitionKind, ParseError};

/// Keywords that end a field clause, in the order the database prints them.
const FIELD_CLAUSES: &[&str] = &[
    "TYPE",
    "DEFAULT",
    "READONLY",
    "VALUE",
    "ASSERT",
    "REFERENCE",
    "PERMISSIONS",
    "COMMENT",
];

/// Keywords that end an index column list.
const INDEX_CLAUSES: &[&str] = &[
    "UNIQUE",
    "SEARCH",
    "FULLTEXT",
    "HNSW",
    "MTREE",
    "COUNT",
    "CONCURRENTLY",
    "COMMENT",
];

const IDENT: &str = r"[A-Za-z0-9_]+";
const PATH: &str = r"[A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+|\.\*|\[\*\])*";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("statement pattern is a valid regex")
}

static TABLE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)^\s*DEFINE\s+TABLE\s+(?:OVERWRITE\s+|IF\s+NOT\s+EXISTS\s+)?`?({IDENT})`?"
    ))
});

static FIELD_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)^\s*DEFINE\s+FIELD\s+(?:OVERWRITE\s+|IF\s+NOT\s+EXISTS\s+)?({PATH})\s+ON\s+(?:TABLE\s+)?`?({IDENT})`?"
    ))
});

static INDEX_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)^\s*DEFINE\s+INDEX\s+(?:OVERWRITE\s+|IF\s+NOT\s+EXISTS\s+)?`?({IDENT})`?\s+ON\s+(?:TABLE\s+)?`?({IDENT})`?"
    ))
});

static EVENT_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)^\s*DEFINE\s+EVENT\s+(?:OVERWRITE\s+|IF\s+NOT\s+EXISTS\s+)?`?({IDENT})`?\s+ON\s+(?:TABLE\s+)?`?({IDENT})`?"
    ))
});

static TYPE_RELATION: LazyLock<Regex> = LazyLock::new(|| compile(r"\bTYPE\s+RELATION\b"));

static AS_SELECT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bAS\s+(SELECT\b)"));

/// Parses a `DEFINE TABLE` statement.
///
/// Fields, indexes and events are left empty; they come from separate
/// statements.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedStatement`] if the statement does not
/// start with `DEFINE TABLE <name>`.
pub fn parse_table(statement: &str) -> Result<TableAst, ParseError> {
    let caps = TABLE_HEAD
        .captures(statement)
        .ok_or_else(|| ParseError::unexpected(DefinitionKind::Table, statement))?;
    let name = caps[1].to_string();
    let body = &statement[caps.get(0).map_or(0, |m| m.end())..];

    let view_query = AS_SELECT.captures(body).and_then(|c| c.get(1)).map(|m| {
        let query = &body[m.start()..];
        let end = ["PERMISSIONS", "COMMENT"]
            .iter()
            .filter_map(|kw| find_keyword(query, kw))
            .min()
            .unwrap_or(query.len());
        clean(&query[..end]).to_string()
    });

    let kind = if TYPE_RELATION.is_match(body) {
        TableKind::Relation
    } else if view_query.is_some() {
        TableKind::View
    } else {
        TableKind::Normal
    };

    // Flags must not be read from inside the view query.
    let flags = view_query
        .as_deref()
        .map_or(body, |q| body.split(q).next().unwrap_or(body));

    Ok(TableAst {
        name,
        kind,
        drop: has_keyword(flags, "DROP"),
        schemafull: !has_keyword(flags, "SCHEMALESS"),
        view_query,
        permissions: parse_permissions(body),
        fields: Vec::new(),
        indexes: Vec::new(),
        events: Vec::new(),
    })
}

/// Parses a `DEFINE FIELD` statement.
///
/// A statement without a `TYPE` clause gets the type `any`.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedStatement`] if the field name or target
/// table cannot be read.
pub fn parse_field(statement: &str) -> Result<FieldAst, ParseError> {
    let caps = FIELD_HEAD
        .captures(statement)
        .ok_or_else(|| ParseError::unexpected(DefinitionKind::Field, statement))?;
    let body = &statement[caps.get(0).map_or(0, |m| m.end())..];
    let read = |keyword| clause(body, keyword, FIELD_CLAUSES).map(str::to_string);

    Ok(FieldAst {
        name: caps[1].to_string(),
        ty: read("TYPE").unwrap_or_else(|| "any".to_string()),
        flex: has_keyword(body, "FLEXIBLE"),
        default: read("DEFAULT"),
        value: read("VALUE"),
        assert: read("ASSERT"),
        readonly: has_keyword(body, "READONLY"),
        permissions: parse_permissions(body),
    })
}

/// Parses a `DEFINE INDEX` statement.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedStatement`] for a malformed head and
/// [`ParseError::MissingColumns`] when neither `FIELDS` nor `COLUMNS` is
/// present.
pub fn parse_index(statement: &str) -> Result<IndexAst, ParseError> {
    let caps = INDEX_HEAD
        .captures(statement)
        .ok_or_else(|| ParseError::unexpected(DefinitionKind::Index, statement))?;
    let name = caps[1].to_string();
    let body = &statement[caps.get(0).map_or(0, |m| m.end())..];

    let list = clause(body, "FIELDS", INDEX_CLAUSES)
        .or_else(|| clause(body, "COLUMNS", INDEX_CLAUSES))
        .ok_or_else(|| ParseError::MissingColumns {
            name: name.clone(),
            statement: statement.trim().to_string(),
        })?;
    let columns = list
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    Ok(IndexAst {
        name,
        columns,
        unique: has_keyword(body, "UNIQUE"),
        search: has_keyword(body, "SEARCH") || has_keyword(body, "FULLTEXT"),
        vector: has_keyword(body, "HNSW") || has_keyword(body, "MTREE"),
    })
}

/// Parses a `DEFINE EVENT` statement. A missing `WHEN` means `true`.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedStatement`] for a malformed head and
/// [`ParseError::MissingThen`] when there is no `THEN` clause.
pub fn parse_event(statement: &str) -> Result<EventAst, ParseError> {
    let caps = EVENT_HEAD
        .captures(statement)
        .ok_or_else(|| ParseError::unexpected(DefinitionKind::Event, statement))?;
    let name = caps[1].to_string();
    let body = &statement[caps.get(0).map_or(0, |m| m.end())..];

    let then = clause(body, "THEN", &["COMMENT"]).ok_or_else(|| ParseError::MissingThen {
        name: name.clone(),
        statement: statement.trim().to_string(),
    })?;
    let cond = clause(body, "WHEN", &["THEN"]).unwrap_or("true");

    Ok(EventAst {
        name,
        cond: cond.to_string(),
        then: then.to_string(),
    })
}

/// Returns the statement kind and owning table of a `DEFINE FIELD`,
/// `DEFINE INDEX` or `DEFINE EVENT` statement.
#[must_use]
pub fn parse_target(statement: &str) -> Option<(DefinitionKind, String)> {
    [
        (DefinitionKind::Field, &*FIELD_HEAD),
        (DefinitionKind::Index, &*INDEX_HEAD),
        (DefinitionKind::Event, &*EVENT_HEAD),
    ]
    .into_iter()
    .find_map(|(kind, head)| {
        head.captures(statement)
            .map(|caps| (kind, caps[2].to_string()))
    })
}
