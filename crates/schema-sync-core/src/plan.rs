//! File change planning.
//!
//! [`plan`] renders the generated source for every database table, compares
//! it with the files already on disk and decides, per file, whether to
//! create, replace, merge into or delete it. Nothing is written here; the
//! returned [`FileChange`]s carry the target text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::SchemaAst;
use crate::codegen::{INDEX_FILE, file_name_for, render_index_source, render_table_source, table_for_file};
use crate::diff::tables_equivalent;
use crate::merge::{MergeOptions, merge, untracked_differences};

/// Options for [`plan`].
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Also plan the module index file (`mod.rs`).
    pub include_index: bool,
    /// Markers used when merging.
    pub merge: MergeOptions,
}

impl PlanOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans the module index file as well.
    #[must_use]
    pub const fn with_index(mut self) -> Self {
        self.include_index = true;
        self
    }

    /// Sets the merge options.
    #[must_use]
    pub fn merge_options(mut self, options: MergeOptions) -> Self {
        self.merge = options;
        self
    }
}

/// What to do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Write a new file.
    Create,
    /// Replace the file content.
    Update,
    /// Write merged content into the existing file.
    Merge,
    /// Remove the file.
    Delete,
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Merge => "merge",
            Self::Delete => "delete",
        })
    }
}

/// One planned file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// File name relative to the schema directory.
    pub file: String,
    /// Table the file belongs to; `None` for the module index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub action: FileAction,
    /// Text to write. `None` for deletions and for merges with nothing to
    /// apply, which only report notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Merge notes for the user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl FileChange {
    fn new(file: impl Into<String>, table: Option<&str>, action: FileAction) -> Self {
        Self {
            file: file.into(),
            table: table.map(str::to_string),
            action,
            content: None,
            notes: Vec::new(),
        }
    }

    fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }
}

/// Plans the file operations that bring `existing` in line with
/// `db_schema`.
///
/// `existing` maps file names to their current text. When `code_schema` is
/// the schema parsed from those files, tables that are semantically equal
/// are left alone even if their text differs, and the rest are merged
/// instead of overwritten; differences the merge cannot edit show up as
/// review notes. Without it, differing files are replaced.
#[must_use]
pub fn plan(
    db_schema: &SchemaAst,
    existing: &BTreeMap<String, String>,
    code_schema: Option<&SchemaAst>,
    options: &PlanOptions,
) -> Vec<FileChange> {
    let mut changes = Vec::new();

    for table in &db_schema.tables {
        let file = file_name_for(&table.name);
        let rendered = render_table_source(table);

        let Some(current) = existing.get(&file) else {
            debug!(table = %table.name, file = %file, "Planning new file");
            changes.push(
                FileChange::new(&file, Some(&table.name), FileAction::Create).with_content(rendered),
            );
            continue;
        };
        if *current == rendered {
            continue;
        }

        let Some(code_table) = code_schema.and_then(|schema| schema.table(&table.name)) else {
            debug!(table = %table.name, file = %file, "Replacing file without a code schema");
            changes.push(
                FileChange::new(&file, Some(&table.name), FileAction::Update).with_content(rendered),
            );
            continue;
        };
        if tables_equivalent(table, code_table)
            && untracked_differences(table, code_table).is_empty()
        {
            debug!(table = %table.name, "Only formatting differs; keeping file");
            continue;
        }

        let merged = merge(current, table, code_table, &options.merge);
        let mut change = FileChange::new(&file, Some(&table.name), FileAction::Merge);
        change.notes = merged.notes();
        if merged.has_edits() {
            change.content = Some(merged.text);
        }
        changes.push(change);
    }

    for file in existing.keys() {
        if let Some(table) = table_for_file(file) {
            if db_schema.table(table).is_none() {
                debug!(table = %table, file = %file, "Planning file removal");
                changes.push(FileChange::new(file, Some(table), FileAction::Delete));
            }
        }
    }

    if options.include_index {
        let rendered = render_index_source(db_schema);
        match existing.get(INDEX_FILE) {
            None => changes
                .push(FileChange::new(INDEX_FILE, None, FileAction::Create).with_content(rendered)),
            Some(current) if *current != rendered => changes
                .push(FileChange::new(INDEX_FILE, None, FileAction::Update).with_content(rendered)),
            Some(_) => {}
        }
    }

    info!(files = changes.len(), "Planned file changes");
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldAst, Permissions, TableAst};

    fn files(entries: &[(&str, String)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(name, text)| ((*name).to_string(), text.clone()))
            .collect()
    }

    fn user() -> TableAst {
        TableAst::normal("user").with_field(FieldAst::new("email", "string"))
    }

    #[test]
    fn missing_files_are_created_and_stale_ones_deleted() {
        let db = SchemaAst::new().with_table(user());
        let existing = files(&[("post.rs", "// old".to_string()), ("notes.txt", String::new())]);

        let changes = plan(&db, &existing, None, &PlanOptions::new());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].file, "user.rs");
        assert_eq!(changes[0].action, FileAction::Create);
        assert_eq!(changes[1].file, "post.rs");
        assert_eq!(changes[1].action, FileAction::Delete);
        assert_eq!(changes[1].content, None);
    }

    #[test]
    fn identical_files_are_skipped() {
        let db = SchemaAst::new().with_table(user());
        let existing = files(&[("user.rs", render_table_source(&user()))]);
        assert!(plan(&db, &existing, None, &PlanOptions::new()).is_empty());
    }

    #[test]
    fn differing_files_are_replaced_without_code_schema() {
        let db = SchemaAst::new().with_table(user());
        let existing = files(&[("user.rs", "// hand written".to_string())]);
        let changes = plan(&db, &existing, None, &PlanOptions::new());
        assert_eq!(changes[0].action, FileAction::Update);
        assert_eq!(changes[0].content.as_deref(), Some(render_table_source(&user()).as_str()));
    }

    #[test]
    fn formatting_only_differences_are_ignored() {
        let db = SchemaAst::new().with_table(user());
        let code = SchemaAst::new().with_table(user());
        let text = render_table_source(&user()).replace("    ", "  ");
        let existing = files(&[("user.rs", text)]);
        assert!(plan(&db, &existing, Some(&code), &PlanOptions::new()).is_empty());
    }

    #[test]
    fn semantic_differences_are_merged() {
        let db_user = user().with_field(FieldAst::new("age", "int"));
        let db = SchemaAst::new().with_table(db_user);
        let code = SchemaAst::new().with_table(user());
        let original = format!("// keep me\n{}", render_table_source(&user()));
        let existing = files(&[("user.rs", original)]);

        let changes = plan(&db, &existing, Some(&code), &PlanOptions::new());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, FileAction::Merge);
        let content = changes[0].content.as_deref().unwrap();
        assert!(content.starts_with("// keep me\n"));
        assert!(content.contains("(\"age\", Field::int()),"));
        assert_eq!(changes[0].notes, ["added field age"]);
    }

    #[test]
    fn permission_differences_are_noted_for_review() {
        let mut db_user = user();
        db_user.permissions = Permissions::full();
        let db = SchemaAst::new().with_table(db_user.clone());
        let code = SchemaAst::new().with_table(user());
        let existing = files(&[("user.rs", render_table_source(&user()))]);

        let with_code = plan(&db, &existing, Some(&code), &PlanOptions::new());
        assert_eq!(with_code.len(), 1);
        assert_eq!(with_code[0].action, FileAction::Merge);
        assert_eq!(with_code[0].content, None);
        assert_eq!(with_code[0].notes, ["review: table user: permissions differ from the database"]);

        let without_code = plan(&db, &existing, None, &PlanOptions::new());
        assert_eq!(without_code[0].action, FileAction::Update);
        assert_eq!(without_code[0].content, Some(render_table_source(&db_user)));
    }

    #[test]
    fn index_file_is_planned_on_request() {
        let db = SchemaAst::new().with_table(user());
        let existing = files(&[("user.rs", render_table_source(&user()))]);
        let changes = plan(&db, &existing, None, &PlanOptions::new().with_index());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].file, INDEX_FILE);
        assert_eq!(changes[0].table, None);
        assert_eq!(changes[0].action, FileAction::Create);
    }
}
