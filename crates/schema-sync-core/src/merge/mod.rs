//! Smart merge of generated table sources.
//!
//! [`merge`] applies the difference between a database table and the code
//! table parsed from an existing source file to that file's text, without
//! regenerating it:
//!
//! - added fields are inserted at the end of the `.fields(vec![..])` block;
//! - added indexes get a new `pub fn` before the `definitions()` aggregate,
//!   and their identifier is spliced into the aggregate's list;
//! - removed fields and indexes are commented out in place.
//!
//! Every inserted or commented-out block is preceded by a marker comment.
//! Lines that are not targeted are never touched. Nested and element fields,
//! changed attributes and table-level changes are reported for manual review
//! instead of being edited.

mod scanner;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::ast::{FieldAst, IndexAst, TableAst, is_nested_path, is_wildcard_path, normalize_field_name};
use crate::codegen::{AGGREGATE_FN, index_ident, render_entry, render_index_fn};
use crate::diff::{ChangeKind, Direction, compare_tables};

use scanner::{
    CodeChars, End, declaration_end, ends_line, entries, indentation, is_code, line_end,
    line_start, matching_close, starts_line,
};

static FIELDS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.fields\(\s*vec!\s*\[").expect("fields block pattern is a valid regex")
});

static ENTRY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\(\s*"((?:[^"\\]|\\.)*)""#).expect("entry pattern is a valid regex")
});

static VEC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vec!\s*\[").expect("vec pattern is a valid regex"));

/// Marker comments written above merged blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Text of the comment above inserted declarations.
    pub added_marker: String,
    /// Text of the comment above commented-out declarations.
    pub removed_marker: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            added_marker: "Added from database schema".to_string(),
            removed_marker: "Removed: no longer in database schema".to_string(),
        }
    }
}

impl MergeOptions {
    /// Sets the marker for inserted declarations.
    #[must_use]
    pub fn added_marker(mut self, marker: impl Into<String>) -> Self {
        self.added_marker = marker.into();
        self
    }

    /// Sets the marker for commented-out declarations.
    #[must_use]
    pub fn removed_marker(mut self, marker: impl Into<String>) -> Self {
        self.removed_marker = marker.into();
        self
    }
}

/// The merged text and what was done to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    /// The edited source text.
    pub text: String,
    pub added_fields: Vec<String>,
    pub added_indexes: Vec<String>,
    pub removed_fields: Vec<String>,
    pub removed_indexes: Vec<String>,
    /// Differences that were not applied, with the reason.
    pub skipped: Vec<String>,
    /// Differences the merge cannot express as an insertion or removal.
    pub review: Vec<String>,
}

impl MergeResult {
    /// Returns `true` if any declaration was added or removed.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !(self.added_fields.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_fields.is_empty()
            && self.removed_indexes.is_empty())
    }

    /// One human-readable line per action, skip and review item.
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        notes.extend(self.added_fields.iter().map(|f| format!("added field {f}")));
        notes.extend(self.added_indexes.iter().map(|i| format!("added index {i}")));
        notes.extend(self.removed_fields.iter().map(|f| format!("commented out field {f}")));
        notes.extend(self.removed_indexes.iter().map(|i| format!("commented out index {i}")));
        notes.extend(self.skipped.iter().map(|s| format!("skipped: {s}")));
        notes.extend(self.review.iter().map(|r| format!("review: {r}")));
        notes
    }
}

/// Merges the differences between `db_table` and `code_table` into
/// `existing`, the source text `code_table` was read from.
///
/// The database side is authoritative: fields and indexes only in
/// `db_table` are added, those only in `code_table` are commented out.
#[must_use]
pub fn merge(
    existing: &str,
    db_table: &TableAst,
    code_table: &TableAst,
    options: &MergeOptions,
) -> MergeResult {
    let changes = compare_tables(db_table, code_table, Direction::Pull);
    let mut result = MergeResult {
        text: existing.to_string(),
        ..MergeResult::default()
    };

    let removed_roots: Vec<&str> = changes
        .iter()
        .filter(|c| c.kind == ChangeKind::FieldRemoved)
        .filter_map(|c| c.field.as_deref())
        .filter(|name| is_top_level(name))
        .collect();
    let added_roots: Vec<&str> = changes
        .iter()
        .filter(|c| c.kind == ChangeKind::FieldAdded)
        .filter_map(|c| c.field.as_deref())
        .filter(|name| is_top_level(name))
        .collect();

    for change in &changes {
        match change.kind {
            ChangeKind::FieldRemoved => {
                let Some(name) = change.field.as_deref() else {
                    continue;
                };
                if !is_top_level(name) {
                    if !removed_roots.contains(&root_of(name)) {
                        result.skipped.push(format!(
                            "field {name}: nested and element fields need a manual edit"
                        ));
                    }
                    continue;
                }
                match remove_field(&result.text, name, &options.removed_marker) {
                    Ok(text) => {
                        debug!(table = %code_table.name, field = %name, "Commented out field");
                        result.text = text;
                        result.removed_fields.push(name.to_string());
                    }
                    Err(reason) => result.skipped.push(format!("field {name}: {reason}")),
                }
            }
            ChangeKind::IndexRemoved => {
                let Some(name) = change.index.as_deref() else {
                    continue;
                };
                match remove_index(&result.text, name, &options.removed_marker) {
                    Ok(text) => {
                        debug!(table = %code_table.name, index = %name, "Commented out index");
                        result.text = text;
                        result.removed_indexes.push(name.to_string());
                    }
                    Err(reason) => result.skipped.push(format!("index {name}: {reason}")),
                }
            }
            _ => {}
        }
    }

    for change in &changes {
        match change.kind {
            ChangeKind::FieldAdded => {
                let Some(field) = change.field.as_deref().and_then(|n| db_table.field(n)) else {
                    continue;
                };
                if !is_top_level(&field.name) {
                    if !added_roots.contains(&root_of(&field.name)) {
                        result.skipped.push(format!(
                            "field {}: nested and element fields need a manual edit",
                            field.name
                        ));
                    }
                    continue;
                }
                match insert_field(&result.text, db_table, field, &options.added_marker) {
                    Ok(text) => {
                        debug!(table = %db_table.name, field = %field.name, "Inserted field");
                        result.text = text;
                        result.added_fields.push(field.name.clone());
                    }
                    Err(reason) => result.skipped.push(format!("field {}: {reason}", field.name)),
                }
            }
            ChangeKind::IndexAdded => {
                let Some(index) = change.index.as_deref().and_then(|n| db_table.index(n)) else {
                    continue;
                };
                if index.is_detection_only() {
                    result.skipped.push(format!(
                        "index {}: search and vector indexes are managed in the database",
                        index.name
                    ));
                    continue;
                }
                match insert_index(&result.text, db_table, index, &options.added_marker) {
                    Ok((text, spliced)) => {
                        debug!(table = %db_table.name, index = %index.name, "Inserted index");
                        result.text = text;
                        result.added_indexes.push(index.name.clone());
                        if !spliced {
                            result.review.push(format!(
                                "index {}: add {}() to {AGGREGATE_FN}() by hand",
                                index.name,
                                index_ident(&index.name)
                            ));
                        }
                    }
                    Err(reason) => result.skipped.push(format!("index {}: {reason}", index.name)),
                }
            }
            ChangeKind::TableTypeChanged
            | ChangeKind::FieldTypeChanged
            | ChangeKind::FieldDefaultChanged
            | ChangeKind::FieldAssertionChanged
            | ChangeKind::IndexModified => result.review.push(change.description.clone()),
            _ => {}
        }
    }
    result.review.extend(untracked_differences(db_table, code_table));

    info!(
        table = %db_table.name,
        added = result.added_fields.len() + result.added_indexes.len(),
        removed = result.removed_fields.len() + result.removed_indexes.len(),
        skipped = result.skipped.len(),
        review = result.review.len(),
        "Merged table source"
    );
    result
}

fn clause(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Differences that no [`ChangeKind`] describes: table options, permissions
/// and the field clauses that are not compared.
pub(crate) fn untracked_differences(db_table: &TableAst, code_table: &TableAst) -> Vec<String> {
    let table = &db_table.name;
    let mut notes = Vec::new();
    if db_table.schemafull != code_table.schemafull {
        let mode = if db_table.schemafull { "SCHEMAFULL" } else { "SCHEMALESS" };
        notes.push(format!("table {table}: the database table is {mode}"));
    }
    if db_table.drop != code_table.drop {
        notes.push(format!("table {table}: DROP differs from the database"));
    }
    if clause(db_table.view_query.as_ref()) != clause(code_table.view_query.as_ref()) {
        notes.push(format!("table {table}: view query differs from the database"));
    }
    if db_table.permissions != code_table.permissions {
        notes.push(format!("table {table}: permissions differ from the database"));
    }

    for field in &db_table.fields {
        let Some(code) = code_table.field_normalized(&field.name) else {
            continue;
        };
        let mut clauses = Vec::new();
        if clause(field.value.as_ref()) != clause(code.value.as_ref()) {
            clauses.push("VALUE");
        }
        if field.flex != code.flex {
            clauses.push("FLEXIBLE");
        }
        if field.readonly != code.readonly {
            clauses.push("READONLY");
        }
        if field.permissions != code.permissions {
            clauses.push("PERMISSIONS");
        }
        if !clauses.is_empty() {
            notes.push(format!(
                "field {}: {} differs from the database",
                field.name,
                clauses.join(", ")
            ));
        }
    }
    notes
}

fn is_top_level(name: &str) -> bool {
    !is_nested_path(name) && !is_wildcard_path(name)
}

fn root_of(name: &str) -> &str {
    name.split(['.', '[']).next().unwrap_or(name)
}

/// First match of `pattern` at or after `from` that starts in code.
fn find_code<'t>(text: &'t str, pattern: &Regex, from: usize) -> Option<regex::Match<'t>> {
    let mut at = from;
    while let Some(found) = pattern.find_at(text, at) {
        if is_code(text, found.start()) {
            return Some(found);
        }
        at = found.end();
    }
    None
}

/// Offsets of the `[` and `]` of the `.fields(vec![..])` block.
fn fields_block(text: &str) -> Option<(usize, usize)> {
    let found = find_code(text, &FIELDS_BLOCK, 0)?;
    let open = found.end() - 1;
    Some((open, matching_close(text, open)?))
}

fn entry_name(entry: &str) -> Option<String> {
    ENTRY_NAME.captures(entry).map(|caps| caps[1].to_string())
}

/// Comments out every line of `start..end`, with a marker line above.
///
/// Returns `None` if the span shares a line with other code.
fn comment_out(text: &str, start: usize, end: usize, marker: &str) -> Option<String> {
    if !starts_line(text, start) || !ends_line(text, end) {
        return None;
    }
    let first = line_start(text, start);
    let last = line_end(text, end);
    let mut block = format!("{}// {marker}\n", indentation(text, start));
    for line in text[first..last].split_inclusive('\n') {
        let code = line.trim_start_matches([' ', '\t']);
        if code.trim().is_empty() {
            block.push_str(line);
        } else {
            block.push_str(&line[..line.len() - code.len()]);
            block.push_str("// ");
            block.push_str(code);
        }
    }
    if !block.ends_with('\n') {
        block.push('\n');
    }

    let mut out = text.to_string();
    out.replace_range(first..last, &block);
    Some(out)
}

fn remove_field(text: &str, name: &str, marker: &str) -> Result<String, &'static str> {
    let (open, close) = fields_block(text).ok_or("no .fields(vec![..]) block found")?;
    let wanted = normalize_field_name(name);
    let entry = entries(text, open, close)
        .into_iter()
        .find(|e| {
            entry_name(&text[e.start..e.end]).is_some_and(|n| normalize_field_name(&n) == wanted)
        })
        .ok_or("declaration not found in .fields(vec![..])")?;
    let end = declaration_end(text, entry.start)
        .ok_or("could not find the end of the declaration")?
        .after(text);
    comment_out(text, entry.start, end, marker).ok_or("declaration shares a line with other code")
}

fn insert_field(
    text: &str,
    table: &TableAst,
    field: &FieldAst,
    marker: &str,
) -> Result<String, &'static str> {
    let (open, close) = fields_block(text).ok_or("no .fields(vec![..]) block found")?;
    let items = entries(text, open, close);

    let indent = match items.first() {
        Some(first) if starts_line(text, first.start) => indentation(text, first.start).to_string(),
        _ if starts_line(text, close) => format!("{}    ", indentation(text, close)),
        _ => format!("{}    ", indentation(text, open)),
    };
    let trailing = !matches!(items.last(), Some(last) if last.comma.is_none());
    let comma = if trailing { "," } else { "" };
    let entry = render_entry(table, field, &indent);

    let mut out = text.to_string();
    if starts_line(text, close) {
        let at = line_start(text, close);
        out.insert_str(at, &format!("{indent}// {marker}\n{entry}{comma}\n"));
    } else {
        let close_indent = indentation(text, close);
        out.insert_str(
            close,
            &format!("\n{indent}// {marker}\n{entry}{comma}\n{close_indent}"),
        );
    }
    if let Some(last) = items.last().filter(|last| last.comma.is_none()) {
        out.insert(last.end, ',');
    }
    Ok(out)
}

/// Start of the item declaration at `offset`, including doc comments and
/// attributes directly above it.
fn item_start(text: &str, offset: usize) -> usize {
    let mut at = line_start(text, offset);
    while at > 0 {
        let previous = line_start(text, at - 1);
        let line = text[previous..at].trim();
        if line.starts_with("///") || line.starts_with("#[") {
            at = previous;
        } else {
            break;
        }
    }
    at
}

fn find_fn(text: &str, ident: &str) -> Option<usize> {
    let pattern = Regex::new(&format!(
        r"\b(?:pub(?:\([^)]*\))?\s+)?fn\s+{}\s*\(",
        regex::escape(ident)
    ))
    .ok()?;
    find_code(text, &pattern, 0).map(|m| m.start())
}

/// Offsets of the `[` and `]` of the aggregate's `vec![..]`.
fn aggregate_list(text: &str) -> Option<(usize, usize)> {
    let start = find_fn(text, AGGREGATE_FN)?;
    let body_open = CodeChars::new(text, start)
        .find(|(_, c)| *c == '{')
        .map(|(i, _)| i)?;
    let body_close = matching_close(text, body_open)?;
    let found = find_code(text, &VEC_LITERAL, body_open).filter(|m| m.end() <= body_close)?;
    let open = found.end() - 1;
    Some((open, matching_close(text, open)?))
}

fn insert_index(
    text: &str,
    table: &TableAst,
    index: &IndexAst,
    marker: &str,
) -> Result<(String, bool), &'static str> {
    let ident = index_ident(&index.name);
    if find_fn(text, &ident).is_some() {
        return Err("a function with the same name already exists");
    }
    let source = render_index_fn(&table.name, index).ok_or("index is not rendered")?;

    let mut out = text.to_string();
    match find_fn(text, AGGREGATE_FN) {
        Some(aggregate) => {
            let at = item_start(text, aggregate);
            out.insert_str(at, &format!("// {marker}\n{source}\n"));
        }
        None => {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("\n// {marker}\n{source}"));
            return Ok((out, false));
        }
    }

    match splice_into_aggregate(&out, &format!("{ident}().into()")) {
        Some(spliced) => Ok((spliced, true)),
        None => Ok((out, false)),
    }
}

fn splice_into_aggregate(text: &str, item: &str) -> Option<String> {
    let (open, close) = aggregate_list(text)?;
    let items = entries(text, open, close);
    let mut out = text.to_string();

    match items.last() {
        None => out.insert_str(close, item),
        Some(last) if starts_line(text, close) => {
            let indent = indentation(text, last.start).to_string();
            let comma = if last.comma.is_some() { "," } else { "" };
            out.insert_str(line_start(text, close), &format!("{indent}{item}{comma}\n"));
            if last.comma.is_none() {
                out.insert(last.end, ',');
            }
        }
        Some(last) => match last.comma {
            Some(comma) => out.insert_str(comma + 1, &format!(" {item},")),
            None => out.insert_str(last.end, &format!(", {item}")),
        },
    }
    Some(out)
}

fn remove_index(text: &str, name: &str, marker: &str) -> Result<String, &'static str> {
    let ident = index_ident(name);
    let declaration = find_fn(text, &ident).ok_or("declaration not found")?;
    let end = match declaration_end(text, declaration) {
        Some(end @ End::Body(_)) => end.after(text),
        _ => return Err("could not find the end of the declaration"),
    };
    let start = item_start(text, declaration);
    let start = text[start..]
        .find(|c: char| !c.is_whitespace())
        .map_or(declaration, |n| start + n);
    let out =
        comment_out(text, start, end, marker).ok_or("declaration shares a line with other code")?;
    Ok(remove_from_aggregate(&out, &ident, marker))
}

fn remove_from_aggregate(text: &str, ident: &str, marker: &str) -> String {
    let Some((open, close)) = aggregate_list(text) else {
        return text.to_string();
    };
    let items = entries(text, open, close);
    let call = format!("{ident}()");
    let Some(position) = items
        .iter()
        .position(|e| text[e.start..e.end].starts_with(&call))
    else {
        return text.to_string();
    };
    let entry = items[position];
    let end = entry.comma.map_or(entry.end, |comma| comma + 1);
    if let Some(out) = comment_out(text, entry.start, end, marker) {
        return out;
    }

    let mut out = text.to_string();
    match (entry.comma, position.checked_sub(1).map(|p| items[p])) {
        (Some(comma), _) => {
            let after = text[comma + 1..]
                .find(|c: char| c != ' ')
                .map_or(text.len(), |n| comma + 1 + n);
            out.replace_range(entry.start..after, "");
        }
        (None, Some(previous)) => {
            let from = previous.comma.unwrap_or(previous.end);
            out.replace_range(from..entry.end, "");
        }
        (None, None) => out.replace_range(entry.start..entry.end, ""),
    }
    out
}
