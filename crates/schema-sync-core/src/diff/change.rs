//! Typed schema changes.

use serde::{Deserialize, Serialize};

/// The stable tag vocabulary of a [`Change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    TableAdded,
    TableRemoved,
    TableTypeChanged,
    FieldAdded,
    FieldRemoved,
    FieldTypeChanged,
    FieldDefaultChanged,
    FieldAssertionChanged,
    IndexAdded,
    IndexRemoved,
    IndexModified,
}

impl ChangeKind {
    /// The snake_case tag, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TableAdded => "table_added",
            Self::TableRemoved => "table_removed",
            Self::TableTypeChanged => "table_type_changed",
            Self::FieldAdded => "field_added",
            Self::FieldRemoved => "field_removed",
            Self::FieldTypeChanged => "field_type_changed",
            Self::FieldDefaultChanged => "field_default_changed",
            Self::FieldAssertionChanged => "field_assertion_changed",
            Self::IndexAdded => "index_added",
            Self::IndexRemoved => "index_removed",
            Self::IndexModified => "index_modified",
        }
    }

    /// The kind produced when source and target are swapped.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::TableAdded => Self::TableRemoved,
            Self::TableRemoved => Self::TableAdded,
            Self::FieldAdded => Self::FieldRemoved,
            Self::FieldRemoved => Self::FieldAdded,
            Self::IndexAdded => Self::IndexRemoved,
            Self::IndexRemoved => Self::IndexAdded,
            other => other,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a comparison is being presented.
///
/// Only the rendered descriptions depend on the direction; the structural
/// content of every [`Change`] is the same either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Source is code, target is the database: changes will be applied to
    /// the database.
    #[default]
    Push,
    /// Source is the database, target is code: changes describe what the
    /// code is missing.
    Pull,
}

impl Direction {
    /// Name of the side the changes come from.
    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::Push => "code",
            Self::Pull => "database",
        }
    }

    /// Name of the side the changes apply to.
    #[must_use]
    pub const fn target_label(self) -> &'static str {
        match self {
            Self::Push => "database",
            Self::Pull => "code",
        }
    }
}

/// One atomic difference between two schema ASTs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Change tag.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Affected table.
    pub table: String,
    /// Affected field path, for field changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Affected index name, for index changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Value on the target side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// Value on the source side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Human-readable description.
    pub description: String,
}

impl Change {
    pub(crate) fn new(kind: ChangeKind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            field: None,
            index: None,
            old_value: None,
            new_value: None,
            description: String::new(),
        }
    }

    pub(crate) fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub(crate) fn with_index(mut self, index: &str) -> Self {
        self.index = Some(index.to_string());
        self
    }

    pub(crate) fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Fills in the description for the given direction.
    pub(crate) fn describe(mut self, direction: Direction) -> Self {
        self.description = describe(&self, direction);
        self
    }

    /// `table.field` or `table.index`, whichever applies.
    #[must_use]
    pub fn subject(&self) -> String {
        match (&self.field, &self.index) {
            (Some(field), _) => format!("{}.{field}", self.table),
            (None, Some(index)) => format!("{}.{index}", self.table),
            (None, None) => self.table.clone(),
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

fn shown(value: Option<&String>) -> &str {
    value.map_or("(none)", String::as_str)
}

fn describe(change: &Change, direction: Direction) -> String {
    let source = direction.source_label();
    let target = direction.target_label();
    let old = shown(change.old_value.as_ref());
    let new = shown(change.new_value.as_ref());
    let subject = change.subject();

    let noun = match change.kind {
        ChangeKind::TableAdded | ChangeKind::TableRemoved | ChangeKind::TableTypeChanged => {
            format!("Table '{subject}'")
        }
        ChangeKind::IndexAdded | ChangeKind::IndexRemoved | ChangeKind::IndexModified => {
            format!("Index '{subject}'")
        }
        _ => format!("Field '{subject}'"),
    };
    let attribute = match change.kind {
        ChangeKind::TableTypeChanged | ChangeKind::FieldTypeChanged => "type",
        ChangeKind::FieldDefaultChanged => "default",
        ChangeKind::FieldAssertionChanged => "assertion",
        _ => "definition",
    };

    match (direction, change.kind) {
        (Direction::Push, ChangeKind::TableAdded | ChangeKind::IndexAdded) => {
            format!("{noun} will be created")
        }
        (Direction::Push, ChangeKind::FieldAdded) => format!("{noun} will be added"),
        (
            Direction::Push,
            ChangeKind::TableRemoved | ChangeKind::FieldRemoved | ChangeKind::IndexRemoved,
        ) => format!("{noun} will be removed"),
        (Direction::Push, _) => {
            format!("{noun} {attribute} will change from {old} to {new}")
        }
        (
            Direction::Pull,
            ChangeKind::TableAdded | ChangeKind::FieldAdded | ChangeKind::IndexAdded,
        ) => format!("{noun} exists in {source} but not in {target}"),
        (
            Direction::Pull,
            ChangeKind::TableRemoved | ChangeKind::FieldRemoved | ChangeKind::IndexRemoved,
        ) => format!("{noun} exists in {target} but not in {source}"),
        (Direction::Pull, _) => {
            format!("{noun} {attribute} differs ({source}: {new}, {target}: {old})")
        }
    }
}
