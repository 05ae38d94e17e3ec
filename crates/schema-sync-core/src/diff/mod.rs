//! Schema differ.
//!
//! Compares a *source* [`SchemaAst`] (the side that should become true) with
//! a *target* [`SchemaAst`] and produces an ordered list of [`Change`]s:
//!
//! - tables only in source are `table_added`, only in target
//!   `table_removed`;
//! - fields are matched by normalized path (`a[*]` and `a.*` are the same
//!   field) and compared by normalized type, default and assertion, one
//!   change per differing attribute;
//! - indexes are matched by name and compared by column list (order
//!   matters) and uniqueness.

mod change;
mod normalize;

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{FieldAst, IndexAst, SchemaAst, TableAst, normalize_field_name, parent_path};

pub use change::{Change, ChangeKind, Direction};
pub use normalize::{element_type, is_object_type, normalize_type};

pub(crate) use normalize::split_top_level;

/// Compares two schemas.
///
/// Changes are ordered: added tables, removed tables, then per-table
/// changes for tables present on both sides, each group in source order.
#[must_use]
pub fn compare(source: &SchemaAst, target: &SchemaAst, direction: Direction) -> Vec<Change> {
    let target_tables: BTreeMap<&str, &TableAst> = target
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();
    let source_tables: BTreeMap<&str, &TableAst> = source
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();

    let mut changes = Vec::new();

    for table in &source.tables {
        if !target_tables.contains_key(table.name.as_str()) {
            changes.push(Change::new(ChangeKind::TableAdded, &table.name).describe(direction));
        }
    }

    for table in &target.tables {
        if !source_tables.contains_key(table.name.as_str()) {
            changes.push(Change::new(ChangeKind::TableRemoved, &table.name).describe(direction));
        }
    }

    for table in &source.tables {
        if let Some(other) = target_tables.get(table.name.as_str()) {
            changes.extend(compare_tables(table, other, direction));
        }
    }

    debug!(direction = ?direction, changes = changes.len(), "Compared schemas");
    changes
}

/// Compares two versions of the same table.
#[must_use]
pub fn compare_tables(source: &TableAst, target: &TableAst, direction: Direction) -> Vec<Change> {
    let mut changes = Vec::new();

    if source.kind != target.kind {
        changes.push(
            Change::new(ChangeKind::TableTypeChanged, &source.name)
                .with_values(
                    Some(target.kind.to_string()),
                    Some(source.kind.to_string()),
                )
                .describe(direction),
        );
    }

    diff_fields(source, target, direction, &mut changes);
    diff_indexes(source, target, direction, &mut changes);
    changes
}

/// Returns `true` if two tables produce no changes.
#[must_use]
pub fn tables_equivalent(a: &TableAst, b: &TableAst) -> bool {
    compare_tables(a, b, Direction::Push).is_empty()
}

/// A wildcard constraint whose type is exactly the element type of its
/// parent's `array<T>` / `set<T>`. The database declares these on its own,
/// so their presence on only one side is not a difference.
fn is_implied_element(table: &TableAst, field: &FieldAst) -> bool {
    if !field.is_wildcard()
        || field.default.is_some()
        || field.value.is_some()
        || field.assert.is_some()
    {
        return false;
    }
    parent_path(&field.name)
        .and_then(|parent| table.field_normalized(&parent))
        .and_then(|parent| element_type(&parent.ty))
        .is_some_and(|element| element == normalize_type(&field.ty))
}

fn trimmed(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn diff_fields(
    source: &TableAst,
    target: &TableAst,
    direction: Direction,
    changes: &mut Vec<Change>,
) {
    let target_fields: BTreeMap<String, &FieldAst> = target
        .fields
        .iter()
        .map(|f| (normalize_field_name(&f.name), f))
        .collect();
    let source_fields: BTreeMap<String, &FieldAst> = source
        .fields
        .iter()
        .map(|f| (normalize_field_name(&f.name), f))
        .collect();
    let table = source.name.as_str();

    for field in &source.fields {
        let key = normalize_field_name(&field.name);
        let Some(other) = target_fields.get(&key) else {
            if !is_implied_element(source, field) {
                changes.push(
                    Change::new(ChangeKind::FieldAdded, table)
                        .with_field(&field.name)
                        .with_values(None, Some(field.ty.clone()))
                        .describe(direction),
                );
            }
            continue;
        };

        if normalize_type(&field.ty) != normalize_type(&other.ty) {
            changes.push(
                Change::new(ChangeKind::FieldTypeChanged, table)
                    .with_field(&field.name)
                    .with_values(Some(other.ty.clone()), Some(field.ty.clone()))
                    .describe(direction),
            );
        }
        if trimmed(field.default.as_ref()) != trimmed(other.default.as_ref()) {
            changes.push(
                Change::new(ChangeKind::FieldDefaultChanged, table)
                    .with_field(&field.name)
                    .with_values(other.default.clone(), field.default.clone())
                    .describe(direction),
            );
        }
        if trimmed(field.assert.as_ref()) != trimmed(other.assert.as_ref()) {
            changes.push(
                Change::new(ChangeKind::FieldAssertionChanged, table)
                    .with_field(&field.name)
                    .with_values(other.assert.clone(), field.assert.clone())
                    .describe(direction),
            );
        }
    }

    for field in &target.fields {
        let key = normalize_field_name(&field.name);
        if !source_fields.contains_key(&key) && !is_implied_element(target, field) {
            changes.push(
                Change::new(ChangeKind::FieldRemoved, table)
                    .with_field(&field.name)
                    .with_values(Some(field.ty.clone()), None)
                    .describe(direction),
            );
        }
    }
}

/// Short description of an index used as a change value.
fn index_summary(index: &IndexAst) -> String {
    let mut summary = index.columns.join(", ");
    if index.unique {
        summary.push_str(" UNIQUE");
    }
    summary
}

fn diff_indexes(
    source: &TableAst,
    target: &TableAst,
    direction: Direction,
    changes: &mut Vec<Change>,
) {
    let table = source.name.as_str();

    for index in &source.indexes {
        match target.index(&index.name) {
            None => changes.push(
                Change::new(ChangeKind::IndexAdded, table)
                    .with_index(&index.name)
                    .with_values(None, Some(index_summary(index)))
                    .describe(direction),
            ),
            Some(other) if other.columns != index.columns || other.unique != index.unique => {
                changes.push(
                    Change::new(ChangeKind::IndexModified, table)
                        .with_index(&index.name)
                        .with_values(Some(index_summary(other)), Some(index_summary(index)))
                        .describe(direction),
                );
            }
            Some(_) => {}
        }
    }

    for index in &target.indexes {
        if source.index(&index.name).is_none() {
            changes.push(
                Change::new(ChangeKind::IndexRemoved, table)
                    .with_index(&index.name)
                    .with_values(Some(index_summary(index)), None)
                    .describe(direction),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TableKind;

    fn kinds(changes: &[Change]) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn added_field_in_source() {
        let source = TableAst::normal("user")
            .with_field(FieldAst::new("email", "string"))
            .with_field(FieldAst::new("name", "string"));
        let target = TableAst::normal("user").with_field(FieldAst::new("email", "string"));

        let changes = compare_tables(&source, &target, Direction::Push);
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldAdded]);
        assert_eq!(changes[0].field.as_deref(), Some("name"));
        assert_eq!(changes[0].new_value.as_deref(), Some("string"));
    }

    #[test]
    fn one_change_per_differing_attribute() {
        let source = TableAst::normal("post").with_field(
            FieldAst::new("status", "string")
                .with_default("'draft'")
                .with_assert("$value != NONE"),
        );
        let target = TableAst::normal("post").with_field(FieldAst::new("status", "int"));

        let changes = compare_tables(&source, &target, Direction::Push);
        assert_eq!(
            kinds(&changes),
            vec![
                ChangeKind::FieldTypeChanged,
                ChangeKind::FieldDefaultChanged,
                ChangeKind::FieldAssertionChanged,
            ]
        );
        assert_eq!(changes[0].old_value.as_deref(), Some("int"));
        assert_eq!(changes[0].new_value.as_deref(), Some("string"));
    }

    #[test]
    fn option_and_none_union_produce_no_change() {
        let a = TableAst::normal("user").with_field(FieldAst::new("nick", "option<string>"));
        let b = TableAst::normal("user").with_field(FieldAst::new("nick", "none | string"));
        assert!(compare_tables(&a, &b, Direction::Push).is_empty());
    }

    #[test]
    fn wildcard_spellings_match() {
        let a = TableAst::normal("post")
            .with_field(FieldAst::new("tags", "array<string>"))
            .with_field(FieldAst::new("tags[*]", "string"));
        let b = TableAst::normal("post")
            .with_field(FieldAst::new("tags", "array<string>"))
            .with_field(FieldAst::new("tags.*", "string"));
        assert!(compare_tables(&a, &b, Direction::Push).is_empty());
    }

    #[test]
    fn implied_element_on_one_side_is_ignored() {
        let with_element = TableAst::normal("post")
            .with_field(FieldAst::new("tags", "array<string>"))
            .with_field(FieldAst::new("tags[*]", "string"));
        let without = TableAst::normal("post").with_field(FieldAst::new("tags", "array<string>"));
        assert!(compare_tables(&with_element, &without, Direction::Push).is_empty());
        assert!(compare_tables(&without, &with_element, Direction::Push).is_empty());
    }

    #[test]
    fn non_implied_element_is_reported() {
        let source = TableAst::normal("post")
            .with_field(FieldAst::new("tags", "array"))
            .with_field(FieldAst::new("tags.*", "string"));
        let target = TableAst::normal("post").with_field(FieldAst::new("tags", "array"));
        let changes = compare_tables(&source, &target, Direction::Push);
        assert_eq!(kinds(&changes), vec![ChangeKind::FieldAdded]);
    }

    #[test]
    fn index_matched_by_name_and_column_order_matters() {
        let source = TableAst::normal("user").with_index(IndexAst::new("idx", ["a", "b"]));
        let target = TableAst::normal("user").with_index(IndexAst::new("idx", ["b", "a"]));
        let changes = compare_tables(&source, &target, Direction::Push);
        assert_eq!(kinds(&changes), vec![ChangeKind::IndexModified]);
        assert_eq!(changes[0].old_value.as_deref(), Some("b, a"));

        let unique = TableAst::normal("user").with_index(IndexAst::new("idx", ["a", "b"]).unique());
        assert_eq!(
            kinds(&compare_tables(&unique, &source, Direction::Push)),
            vec![ChangeKind::IndexModified]
        );
    }

    #[test]
    fn index_only_in_target_is_removed() {
        let source = TableAst::normal("user");
        let target =
            TableAst::normal("user").with_index(IndexAst::new("idx_email", ["email"]).unique());
        let changes = compare_tables(&source, &target, Direction::Push);
        assert_eq!(kinds(&changes), vec![ChangeKind::IndexRemoved]);
        assert_eq!(changes[0].index.as_deref(), Some("idx_email"));
    }

    #[test]
    fn schema_level_ordering() {
        let source = SchemaAst::new()
            .with_table(TableAst::normal("a"))
            .with_table(TableAst::new("shared", TableKind::Relation));
        let target = SchemaAst::new()
            .with_table(TableAst::normal("shared"))
            .with_table(TableAst::normal("b"));

        let changes = compare(&source, &target, Direction::Push);
        assert_eq!(
            kinds(&changes),
            vec![
                ChangeKind::TableAdded,
                ChangeKind::TableRemoved,
                ChangeKind::TableTypeChanged,
            ]
        );
        assert_eq!(changes[2].old_value.as_deref(), Some("NORMAL"));
        assert_eq!(changes[2].new_value.as_deref(), Some("RELATION"));
    }

    #[test]
    fn direction_changes_only_descriptions() {
        let source = SchemaAst::new().with_table(TableAst::normal("user"));
        let target = SchemaAst::new();

        let push = compare(&source, &target, Direction::Push);
        let pull = compare(&source, &target, Direction::Pull);
        assert_eq!(kinds(&push), kinds(&pull));
        assert_ne!(push[0].description, pull[0].description);
    }
}
