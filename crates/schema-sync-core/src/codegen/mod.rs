//! Rust source generation for code-side schemas.
//!
//! Each table becomes one module file:
//!
//! ```text
//! use schema_sync_core::model::{Definition, Field, IndexDef, Model, PermissionKind, Permissions};
//!
//! pub fn model() -> Model {
//!     Model::normal("user")
//!         .permissions(Permissions::full())
//!         .fields(vec![
//!             ("email", Field::string()),
//!         ])
//! }
//!
//! pub fn idx_email() -> IndexDef {
//!     IndexDef::on(&model(), "idx_email").fields(["email"]).unique()
//! }
//!
//! pub fn definitions() -> Vec<Definition> {
//!     vec![model().into(), idx_email().into()]
//! }
//! ```
//!
//! The merge engine relies on this layout: the `.fields(vec![` block, one
//! `pub fn` per index and the trailing `definitions()` aggregate.

mod field;

use tracing::warn;

use crate::ast::{IndexAst, SchemaAst, TableAst, TableKind};

pub(crate) use field::render_entry;

/// Name of the module index file.
pub const INDEX_FILE: &str = "mod.rs";

/// Name of the aggregate function in every generated file.
pub const AGGREGATE_FN: &str = "definitions";

const IMPORTS: &str = "#[allow(unused_imports)]\nuse schema_sync_core::model::{Definition, Field, IndexDef, Model, PermissionKind, Permissions};\n";

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Identifiers that cannot be written even as raw identifiers.
const RESERVED: &[&str] = &["crate", "self", "Self", "super", "_"];

/// File name for a table's module.
#[must_use]
pub fn file_name_for(table: &str) -> String {
    format!("{table}.rs")
}

/// Table name for a generated file name, or `None` for other files.
#[must_use]
pub fn table_for_file(file: &str) -> Option<&str> {
    if file == INDEX_FILE {
        return None;
    }
    file.strip_suffix(".rs").filter(|name| !name.is_empty())
}

/// Function identifier for an index.
///
/// Characters outside `[A-Za-z0-9_]` become `_`. Names that would clash with
/// the generated `model` / `definitions` functions, start with a digit or are
/// keywords get an `index_` prefix.
///
/// ```
/// use schema_sync_core::codegen::index_ident;
///
/// assert_eq!(index_ident("idx_email"), "idx_email");
/// assert_eq!(index_ident("user-email"), "user_email");
/// assert_eq!(index_ident("model"), "index_model");
/// ```
#[must_use]
pub fn index_ident(name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let clashes = ident.is_empty()
        || ident.starts_with(|c: char| c.is_ascii_digit())
        || ident == "model"
        || ident == AGGREGATE_FN
        || RUST_KEYWORDS.contains(&ident.as_str())
        || RESERVED.contains(&ident.as_str());
    if clashes {
        format!("index_{ident}")
    } else {
        ident
    }
}

/// `pub mod` declaration for a table's module in the index file.
fn module_declaration(table: &str) -> (String, String) {
    let plain = table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && !RESERVED.contains(&table);
    if !plain {
        let ident = format!("table_{}", index_ident(table).trim_start_matches("index_"));
        let declaration = format!("#[path = {:?}]\npub mod {ident};", file_name_for(table));
        return (declaration, ident);
    }
    let ident = if RUST_KEYWORDS.contains(&table) {
        format!("r#{table}")
    } else {
        table.to_string()
    };
    (format!("pub mod {ident};"), ident)
}

/// Renders the module file for one table.
#[must_use]
pub fn render_table_source(table: &TableAst) -> String {
    let mut out = format!(
        "//! Table `{}`.\n//!\n//! Generated by schema-sync. Hand edits are kept when the file is merged.\n\n{IMPORTS}\n",
        table.name
    );

    out.push_str(&render_model_fn(table));

    let mut aggregate = vec!["model().into()".to_string()];
    for index in &table.indexes {
        if let Some(source) = render_index_fn(&table.name, index) {
            out.push('\n');
            out.push_str(&source);
            aggregate.push(format!("{}().into()", index_ident(&index.name)));
        }
    }

    out.push_str(&format!(
        "\npub fn {AGGREGATE_FN}() -> Vec<Definition> {{\n    vec![{}]\n}}\n",
        aggregate.join(", ")
    ));
    out
}

fn render_model_fn(table: &TableAst) -> String {
    let constructor = match (table.kind, &table.view_query) {
        (TableKind::View, Some(query)) => format!("Model::view({:?}, {query:?})", table.name),
        (TableKind::Relation, _) => format!("Model::relation({:?})", table.name),
        _ => format!("Model::normal({:?})", table.name),
    };

    let mut out = format!("pub fn model() -> Model {{\n    {constructor}\n");
    if !table.schemafull {
        out.push_str("        .schemaless()\n");
    }
    if table.drop {
        out.push_str("        .drop()\n");
    }
    if let Some(permissions) = field::render_permissions(&table.permissions) {
        out.push_str(&format!("        .permissions({permissions})\n"));
    }

    let entries: Vec<String> = field::top_level(table)
        .map(|f| format!("{},\n", render_entry(table, f, "            ")))
        .collect();
    if entries.is_empty() {
        out.push_str("        .fields(vec![])\n");
    } else {
        out.push_str("        .fields(vec![\n");
        out.push_str(&entries.concat());
        out.push_str("        ])\n");
    }
    out.push_str("}\n");
    out
}

/// Renders the `pub fn` for one index, or `None` for full-text and vector
/// indexes, which are managed in the database only.
#[must_use]
pub fn render_index_fn(table: &str, index: &IndexAst) -> Option<String> {
    if index.is_detection_only() {
        warn!(table = %table, index = %index.name, "Skipping search/vector index in generated source");
        return None;
    }
    let columns: Vec<String> = index.columns.iter().map(|c| format!("{c:?}")).collect();
    let unique = if index.unique { ".unique()" } else { "" };
    Some(format!(
        "pub fn {}() -> IndexDef {{\n    IndexDef::on(&model(), {:?}).fields([{}]){unique}\n}}\n",
        index_ident(&index.name),
        index.name,
        columns.join(", ")
    ))
}

/// Renders `mod.rs` declaring every table module and a combined
/// `definitions()`.
#[must_use]
pub fn render_index_source(schema: &SchemaAst) -> String {
    let mut tables: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    tables.sort_unstable();

    let mut declarations = String::new();
    let mut body = String::new();
    for table in tables {
        let (declaration, ident) = module_declaration(table);
        declarations.push_str(&declaration);
        declarations.push('\n');
        body.push_str(&format!("    {AGGREGATE_FN}.extend({ident}::{AGGREGATE_FN}());\n"));
    }

    format!(
        "//! Generated schema modules.\n\nuse schema_sync_core::model::Definition;\n\n{declarations}\n/// Every definition in the schema.\npub fn {AGGREGATE_FN}() -> Vec<Definition> {{\n    let mut {AGGREGATE_FN} = Vec::new();\n{body}    {AGGREGATE_FN}\n}}\n"
    )
}
