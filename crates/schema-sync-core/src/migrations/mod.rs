//! Migration statement generation.
//!
//! Turns a [`Change`] into executable SurrealQL. The authoritative
//! definition is looked up in the *source* schema (the side the change says
//! should become true); removals are checked against the *target* schema.
//! A change whose definition cannot be found renders no statement.
//!
//! Field statements emit their clauses in a fixed order: target, type,
//! value, assert, default, readonly, permissions.

use tracing::{debug, warn};

use crate::ast::{FieldAst, IndexAst, Permissions, SchemaAst, TableAst, TableKind};
use crate::diff::{Change, ChangeKind};

/// Whether a DEFINE statement replaces an existing definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineMode {
    /// Plain `DEFINE`.
    Create,
    /// `DEFINE ... OVERWRITE`.
    Overwrite,
}

impl DefineMode {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Create => "",
            Self::Overwrite => " OVERWRITE",
        }
    }
}

/// Renders the statement(s) for one change.
///
/// `table_added` yields a multi-statement script separated by newlines;
/// every other change yields a single `;`-terminated statement.
#[must_use]
pub fn render(change: &Change, source: &SchemaAst, target: &SchemaAst) -> Option<String> {
    let table_name = change.table.as_str();
    let rendered = match change.kind {
        ChangeKind::TableAdded => source.table(table_name).map(render_table),
        ChangeKind::TableRemoved => target
            .table(table_name)
            .map(|t| format!("REMOVE TABLE {};", t.name)),
        ChangeKind::TableTypeChanged => source
            .table(table_name)
            .map(|t| render_table_definition(t, DefineMode::Overwrite)),
        ChangeKind::FieldAdded => source_field(change, source)
            .map(|(t, f)| render_field(&t.name, f, DefineMode::Create)),
        ChangeKind::FieldRemoved => target
            .table(table_name)
            .zip(change.field.as_deref())
            .and_then(|(t, name)| t.field_normalized(name))
            .map(|f| format!("REMOVE FIELD {} ON TABLE {table_name};", f.name)),
        ChangeKind::FieldTypeChanged
        | ChangeKind::FieldDefaultChanged
        | ChangeKind::FieldAssertionChanged => source_field(change, source)
            .map(|(t, f)| render_field(&t.name, f, DefineMode::Overwrite)),
        ChangeKind::IndexAdded => {
            source_index(change, source).and_then(|(t, i)| render_index(&t.name, i, DefineMode::Create))
        }
        ChangeKind::IndexRemoved => target
            .table(table_name)
            .zip(change.index.as_deref())
            .and_then(|(t, name)| t.index(name))
            .map(|i| format!("REMOVE INDEX {} ON TABLE {table_name};", i.name)),
        ChangeKind::IndexModified => source_index(change, source)
            .and_then(|(t, i)| render_index(&t.name, i, DefineMode::Overwrite)),
    };

    if rendered.is_none() {
        debug!(change = %change.kind, subject = %change.subject(), "No statement rendered");
    }
    rendered
}

/// Renders every change in order, skipping those that yield no statement.
#[must_use]
pub fn render_all(changes: &[Change], source: &SchemaAst, target: &SchemaAst) -> Vec<String> {
    changes
        .iter()
        .filter_map(|change| render(change, source, target))
        .collect()
}

/// Wraps statements in a single transaction.
#[must_use]
pub fn wrap_in_transaction(statements: &[String]) -> String {
    let mut script = String::from("BEGIN TRANSACTION;\n");
    for statement in statements {
        script.push_str(statement);
        script.push('\n');
    }
    script.push_str("COMMIT TRANSACTION;\n");
    script
}

fn source_field<'a>(change: &Change, source: &'a SchemaAst) -> Option<(&'a TableAst, &'a FieldAst)> {
    let table = source.table(&change.table)?;
    let field = table.field_normalized(change.field.as_deref()?)?;
    Some((table, field))
}

fn source_index<'a>(change: &Change, source: &'a SchemaAst) -> Option<(&'a TableAst, &'a IndexAst)> {
    let table = source.table(&change.table)?;
    let index = table.index(change.index.as_deref()?)?;
    Some((table, index))
}

/// Renders a complete table: its definition, every real field and every
/// regenerable index, one statement per line.
///
/// Wildcard element constraints are skipped. A relation table's `in` and
/// `out` fields use `OVERWRITE` because the table definition declares them
/// implicitly.
#[must_use]
pub fn render_table(table: &TableAst) -> String {
    let mut statements = vec![render_table_definition(table, DefineMode::Create)];
    for field in table.real_fields() {
        let mode = if table.kind == TableKind::Relation && matches!(field.name.as_str(), "in" | "out")
        {
            DefineMode::Overwrite
        } else {
            DefineMode::Create
        };
        statements.push(render_field(&table.name, field, mode));
    }
    statements.extend(
        table
            .indexes
            .iter()
            .filter_map(|index| render_index(&table.name, index, DefineMode::Create)),
    );
    statements.join("\n")
}

/// Renders a `DEFINE TABLE` statement.
#[must_use]
pub fn render_table_definition(table: &TableAst, mode: DefineMode) -> String {
    let mut sql = format!("DEFINE TABLE{} {}", mode.keyword(), table.name);
    match table.kind {
        TableKind::Normal => sql.push_str(" TYPE NORMAL"),
        TableKind::Relation => sql.push_str(" TYPE RELATION"),
        TableKind::View => {}
    }
    if table.drop {
        sql.push_str(" DROP");
    }
    sql.push_str(if table.schemafull {
        " SCHEMAFULL"
    } else {
        " SCHEMALESS"
    });
    if let Some(query) = &table.view_query {
        sql.push_str(" AS ");
        sql.push_str(query);
    }
    push_permissions(&mut sql, &table.permissions);
    sql.push(';');
    sql
}

/// Renders a `DEFINE FIELD` statement with every clause of the field.
#[must_use]
pub fn render_field(table: &str, field: &FieldAst, mode: DefineMode) -> String {
    let mut sql = format!(
        "DEFINE FIELD{} {} ON TABLE {table}",
        mode.keyword(),
        field.name
    );
    if field.flex {
        sql.push_str(" FLEXIBLE");
    }
    sql.push_str(" TYPE ");
    sql.push_str(&field.ty);
    if let Some(value) = &field.value {
        sql.push_str(" VALUE ");
        sql.push_str(value);
    }
    if let Some(assert) = &field.assert {
        sql.push_str(" ASSERT ");
        sql.push_str(assert);
    }
    if let Some(default) = &field.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if field.readonly {
        sql.push_str(" READONLY");
    }
    push_permissions(&mut sql, &field.permissions);
    sql.push(';');
    sql
}

/// Renders a `DEFINE INDEX` statement.
///
/// Search and vector indexes are detection-only and render nothing.
#[must_use]
pub fn render_index(table: &str, index: &IndexAst, mode: DefineMode) -> Option<String> {
    if index.is_detection_only() {
        warn!(
            table = %table,
            index = %index.name,
            "Search and vector indexes are not regenerated; define them manually"
        );
        return None;
    }
    let mut sql = format!(
        "DEFINE INDEX{} {} ON TABLE {table} FIELDS {}",
        mode.keyword(),
        index.name,
        index.columns.join(", ")
    );
    if index.unique {
        sql.push_str(" UNIQUE");
    }
    sql.push(';');
    Some(sql)
}

fn push_permissions(sql: &mut String, permissions: &Permissions) {
    if permissions.is_empty() {
        return;
    }
    sql.push_str(" PERMISSIONS");
    match permissions.uniform() {
        Some(expr) if expr.eq_ignore_ascii_case("FULL") || expr.eq_ignore_ascii_case("NONE") => {
            sql.push(' ');
            sql.push_str(expr);
        }
        _ => {
            for (kind, expr) in permissions.iter() {
                sql.push_str(" FOR ");
                sql.push_str(kind.as_str());
                sql.push(' ');
                sql.push_str(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PermissionKind;
    use crate::diff::{Direction, compare};

    fn user(fields: &[(&str, &str)]) -> TableAst {
        fields.iter().fold(TableAst::normal("user"), |t, (name, ty)| {
            t.with_field(FieldAst::new(*name, *ty))
        })
    }

    #[test]
    fn field_added_renders_plain_define() {
        let source = SchemaAst::new().with_table(user(&[("email", "string"), ("name", "string")]));
        let target = SchemaAst::new().with_table(user(&[("email", "string")]));

        let changes = compare(&source, &target, Direction::Push);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            render(&changes[0], &source, &target).as_deref(),
            Some("DEFINE FIELD name ON TABLE user TYPE string;")
        );
    }

    #[test]
    fn index_removed_renders_remove_statement() {
        let source = SchemaAst::new().with_table(TableAst::normal("user"));
        let target = SchemaAst::new().with_table(
            TableAst::normal("user").with_index(IndexAst::new("idx_email", ["email"]).unique()),
        );

        let changes = compare(&source, &target, Direction::Push);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::IndexRemoved);
        assert_eq!(
            render(&changes[0], &source, &target).as_deref(),
            Some("REMOVE INDEX idx_email ON TABLE user;")
        );
    }

    #[test]
    fn field_change_reemits_full_definition_with_overwrite() {
        let mut field = FieldAst::new("status", "string")
            .with_default("'draft'")
            .with_value("string::lowercase($value)")
            .with_assert("$value != NONE");
        field.permissions.set(PermissionKind::Update, "NONE");
        let source = SchemaAst::new().with_table(TableAst::normal("post").with_field(field));
        let target = SchemaAst::new()
            .with_table(TableAst::normal("post").with_field(FieldAst::new("status", "string")));

        let statements = render_all(&compare(&source, &target, Direction::Push), &source, &target);
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "DEFINE FIELD OVERWRITE status ON TABLE post TYPE string VALUE string::lowercase($value) \
             ASSERT $value != NONE DEFAULT 'draft' PERMISSIONS FOR update NONE;"
        );
        assert_eq!(statements[0], statements[1]);
    }

    #[test]
    fn table_added_renders_full_script() {
        let mut likes = TableAst::new("likes", TableKind::Relation)
            .with_field(FieldAst::new("in", "record<user>"))
            .with_field(FieldAst::new("out", "record<post>"))
            .with_field(FieldAst::new("tags", "array<string>"))
            .with_field(FieldAst::new("tags[*]", "string"))
            .with_index(IndexAst::new("idx_pair", ["in", "out"]).unique());
        likes.indexes.push(IndexAst {
            name: "idx_search".into(),
            columns: vec!["tags".into()],
            search: true,
            ..IndexAst::default()
        });
        likes.permissions = Permissions::full();

        assert_eq!(
            render_table(&likes),
            "DEFINE TABLE likes TYPE RELATION SCHEMAFULL PERMISSIONS FULL;\n\
             DEFINE FIELD OVERWRITE in ON TABLE likes TYPE record<user>;\n\
             DEFINE FIELD OVERWRITE out ON TABLE likes TYPE record<post>;\n\
             DEFINE FIELD tags ON TABLE likes TYPE array<string>;\n\
             DEFINE INDEX idx_pair ON TABLE likes FIELDS in, out UNIQUE;"
        );
    }

    #[test]
    fn table_definition_variants() {
        let mut view = TableAst::new("stats", TableKind::View);
        view.schemafull = false;
        view.view_query = Some("SELECT count() FROM post GROUP ALL".into());
        assert_eq!(
            render_table_definition(&view, DefineMode::Create),
            "DEFINE TABLE stats SCHEMALESS AS SELECT count() FROM post GROUP ALL;"
        );

        let mut log = TableAst::normal("log");
        log.drop = true;
        log.permissions.set(PermissionKind::Select, "WHERE user = $auth.id");
        log.permissions.set(PermissionKind::Delete, "NONE");
        assert_eq!(
            render_table_definition(&log, DefineMode::Overwrite),
            "DEFINE TABLE OVERWRITE log TYPE NORMAL DROP SCHEMAFULL \
             PERMISSIONS FOR select WHERE user = $auth.id FOR delete NONE;"
        );
    }

    #[test]
    fn changes_without_source_definition_render_nothing() {
        let empty = SchemaAst::new();
        let change = Change {
            kind: ChangeKind::FieldAdded,
            table: "ghost".into(),
            field: Some("name".into()),
            index: None,
            old_value: None,
            new_value: None,
            description: String::new(),
        };
        assert_eq!(render(&change, &empty, &empty), None);
    }

    #[test]
    fn transaction_wrapper() {
        let script = wrap_in_transaction(&["REMOVE TABLE a;".to_string()]);
        assert_eq!(script, "BEGIN TRANSACTION;\nREMOVE TABLE a;\nCOMMIT TRANSACTION;\n");
    }
}
