//! Schema AST shared by every component.
//!
//! Both extractors (database introspection and code registration) produce a
//! [`SchemaAst`]; the differ compares two of them and the generators render
//! them back to text. Type expressions are kept as opaque strings because
//! the SurrealQL type grammar is open-ended.

mod field;
mod permissions;

use serde::{Deserialize, Serialize};

pub use field::{
    FieldAst, is_nested_path, is_wildcard_path, normalize_field_name, parent_path,
};
pub use permissions::{PermissionKind, Permissions};

/// The kind of a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// A regular document table.
    #[default]
    Normal,
    /// A graph edge table (`TYPE RELATION`).
    Relation,
    /// A pre-computed view (`AS SELECT ...`).
    View,
}

impl TableKind {
    /// Returns the upper-case keyword used in human-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Relation => "RELATION",
            Self::View => "VIEW",
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexAst {
    /// Index name.
    pub name: String,
    /// Indexed field paths. Order is significant.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Full-text search index. Detected only, never regenerated.
    #[serde(default)]
    pub search: bool,
    /// Vector (HNSW / MTREE) index. Detected only, never regenerated.
    #[serde(default)]
    pub vector: bool,
}

impl IndexAst {
    /// Creates a plain (non-unique) index over the given columns.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Marks the index as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns `true` for index kinds that are only flagged, never rendered.
    #[must_use]
    pub const fn is_detection_only(&self) -> bool {
        self.search || self.vector
    }
}

/// A table event. Captured for completeness, never diffed or generated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventAst {
    pub name: String,
    pub cond: String,
    pub then: String,
}

/// A single table with its fields, indexes and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAst {
    /// Table name.
    pub name: String,
    /// Table kind.
    #[serde(default, rename = "type")]
    pub kind: TableKind,
    /// Table is marked for eventual removal.
    #[serde(default)]
    pub drop: bool,
    /// Undeclared fields are rejected.
    #[serde(default = "default_schemafull")]
    pub schemafull: bool,
    /// The `SELECT ...` query of a view table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_query: Option<String>,
    /// Table-level permissions.
    #[serde(default)]
    pub permissions: Permissions,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldAst>,
    /// Indexes in declaration order.
    #[serde(default)]
    pub indexes: Vec<IndexAst>,
    /// Events in declaration order.
    #[serde(default)]
    pub events: Vec<EventAst>,
}

const fn default_schemafull() -> bool {
    true
}

impl TableAst {
    /// Creates an empty schemafull table of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            drop: false,
            schemafull: true,
            view_query: None,
            permissions: Permissions::default(),
            fields: Vec::new(),
            indexes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Creates an empty normal table.
    #[must_use]
    pub fn normal(name: impl Into<String>) -> Self {
        Self::new(name, TableKind::Normal)
    }

    /// Adds a field, replacing any field with the same path.
    #[must_use]
    pub fn with_field(mut self, field: FieldAst) -> Self {
        self.add_field(field);
        self
    }

    /// Adds an index, replacing any index with the same name.
    #[must_use]
    pub fn with_index(mut self, index: IndexAst) -> Self {
        self.add_index(index);
        self
    }

    /// Adds a field, keeping field paths unique.
    pub fn add_field(&mut self, field: FieldAst) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Adds an index, keeping index names unique.
    pub fn add_index(&mut self, index: IndexAst) {
        match self.indexes.iter_mut().find(|i| i.name == index.name) {
            Some(existing) => *existing = index,
            None => self.indexes.push(index),
        }
    }

    /// Looks up a field by its exact path.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldAst> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by path, treating `a[*]` and `a.*` as the same name.
    #[must_use]
    pub fn field_normalized(&self, name: &str) -> Option<&FieldAst> {
        let wanted = normalize_field_name(name);
        self.fields
            .iter()
            .find(|f| normalize_field_name(&f.name) == wanted)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexAst> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Fields that are settable columns, i.e. not wildcard element constraints.
    pub fn real_fields(&self) -> impl Iterator<Item = &FieldAst> {
        self.fields.iter().filter(|f| !f.is_wildcard())
    }
}

/// An ordered collection of tables with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaAst {
    pub tables: Vec<TableAst>,
}

impl SchemaAst {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name.
    pub fn add_table(&mut self, table: TableAst) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Builder-style [`SchemaAst::add_table`].
    #[must_use]
    pub fn with_table(mut self, table: TableAst) -> Self {
        self.add_table(table);
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableAst> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Mutable table lookup.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableAst> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Returns `true` if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableAst> for SchemaAst {
    fn from_iter<T: IntoIterator<Item = TableAst>>(iter: T) -> Self {
        let mut schema = Self::new();
        for table in iter {
            schema.add_table(table);
        }
        schema
    }
}
