//! Code-side schema declarations.
//!
//! A code schema is a list of [`Definition`]s: table models and the indexes
//! declared on them. Models are registered explicitly through the
//! [`Describe`] trait, so the extractor never needs to load or inspect
//! source files.
//!
//! ```
//! use schema_sync_core::model::{Definition, Field, IndexDef, Model, Permissions};
//!
//! fn model() -> Model {
//!     Model::normal("user")
//!         .permissions(Permissions::full())
//!         .fields(vec![
//!             ("email", Field::string()),
//!             ("tags", Field::array(Field::string())),
//!         ])
//! }
//!
//! let definitions: Vec<Definition> = vec![
//!     model().into(),
//!     IndexDef::on(&model(), "idx_email").fields(["email"]).unique().into(),
//! ];
//! assert_eq!(definitions.len(), 2);
//! ```

mod field;

pub use field::{Field, FieldKind};

pub use crate::ast::{PermissionKind, Permissions, TableKind};

/// A table declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: String,
    kind: TableKind,
    schemafull: bool,
    drop: bool,
    view_query: Option<String>,
    permissions: Permissions,
    fields: Vec<(String, Field)>,
}

impl Model {
    fn with_kind(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            schemafull: true,
            drop: false,
            view_query: None,
            permissions: Permissions::default(),
            fields: Vec::new(),
        }
    }

    /// A schemafull `TYPE NORMAL` table.
    #[must_use]
    pub fn normal(name: impl Into<String>) -> Self {
        Self::with_kind(name, TableKind::Normal)
    }

    /// A `TYPE RELATION` table.
    #[must_use]
    pub fn relation(name: impl Into<String>) -> Self {
        Self::with_kind(name, TableKind::Relation)
    }

    /// A view defined by `AS <query>`.
    #[must_use]
    pub fn view(name: impl Into<String>, query: impl Into<String>) -> Self {
        let mut model = Self::with_kind(name, TableKind::View);
        model.view_query = Some(query.into());
        model
    }

    #[must_use]
    pub const fn schemaless(mut self) -> Self {
        self.schemafull = false;
        self
    }

    #[must_use]
    pub const fn drop(mut self) -> Self {
        self.drop = true;
        self
    }

    #[must_use]
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Appends field declarations, keeping their order.
    #[must_use]
    pub fn fields(mut self, fields: Vec<(&str, Field)>) -> Self {
        self.fields.extend(
            fields
                .into_iter()
                .map(|(name, field)| (name.to_string(), field)),
        );
        self
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> TableKind {
        self.kind
    }

    #[must_use]
    pub const fn is_schemafull(&self) -> bool {
        self.schemafull
    }

    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.drop
    }

    #[must_use]
    pub fn view_query(&self) -> Option<&str> {
        self.view_query.as_deref()
    }

    #[must_use]
    pub const fn permission_rules(&self) -> &Permissions {
        &self.permissions
    }

    /// Top-level field declarations in order.
    #[must_use]
    pub fn declared_fields(&self) -> &[(String, Field)] {
        &self.fields
    }
}

/// Anything that can describe itself as a table model.
///
/// This is the registration point for code-side tables: a type implementing
/// `Describe` can be put into a [`Definition`] list and extracted.
pub trait Describe: Send + Sync {
    /// Returns the table description.
    fn describe(&self) -> Model;
}

impl Describe for Model {
    fn describe(&self) -> Model {
        self.clone()
    }
}

/// An index declared on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    name: String,
    table: String,
    columns: Vec<String>,
    unique: bool,
}

impl IndexDef {
    /// An index named `name` on `table`, with no columns yet.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            unique: false,
        }
    }

    /// An index on the table described by `owner`.
    #[must_use]
    pub fn on(owner: &dyn Describe, name: impl Into<String>) -> Self {
        Self::new(name, owner.describe().name)
    }

    /// Sets the indexed columns, in index order.
    #[must_use]
    pub fn fields<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }
}

/// One exported code-side definition.
pub enum Definition {
    /// A table model.
    Model(Box<dyn Describe>),
    /// An index on a model.
    Index(IndexDef),
}

impl Definition {
    /// Wraps any [`Describe`] implementation.
    #[must_use]
    pub fn model(model: impl Describe + 'static) -> Self {
        Self::Model(Box::new(model))
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(model) => f.debug_tuple("Model").field(&model.describe().name).finish(),
            Self::Index(index) => f.debug_tuple("Index").field(index).finish(),
        }
    }
}

impl From<Model> for Definition {
    fn from(model: Model) -> Self {
        Self::model(model)
    }
}

impl From<IndexDef> for Definition {
    fn from(index: IndexDef) -> Self {
        Self::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account;

    impl Describe for Account {
        fn describe(&self) -> Model {
            Model::normal("account").fields(vec![("owner", Field::record(["user"]))])
        }
    }

    #[test]
    fn index_takes_table_from_owner() {
        let index = IndexDef::on(&Account, "idx_owner").fields(["owner"]);
        assert_eq!(index.table(), "account");
        assert_eq!(index.columns(), ["owner".to_string()]);
        assert!(!index.is_unique());
    }

    #[test]
    fn model_builders() {
        let view = Model::view("adults", "SELECT * FROM user WHERE age >= 18").drop();
        assert_eq!(view.kind(), TableKind::View);
        assert_eq!(view.view_query(), Some("SELECT * FROM user WHERE age >= 18"));
        assert!(view.is_dropped());

        let edge = Model::relation("likes").schemaless();
        assert_eq!(edge.kind(), TableKind::Relation);
        assert!(!edge.is_schemafull());
    }

    #[test]
    fn definitions_accept_custom_describers() {
        let definitions: Vec<Definition> = vec![
            Definition::model(Account),
            IndexDef::new("idx_owner", "account").into(),
        ];
        assert!(matches!(&definitions[0], Definition::Model(m) if m.describe().name() == "account"));
        assert_eq!(format!("{:?}", definitions[0]), "Model(\"account\")");
    }
}
