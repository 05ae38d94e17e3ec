//! Field definitions and field-path helpers.

use serde::{Deserialize, Serialize};

use super::Permissions;

/// A field definition.
///
/// `name` is a simple identifier, a dotted path into object-typed ancestors
/// (`address.city`), or a path ending in a wildcard segment (`tags.*` or
/// `tags[*]`). Wildcard paths constrain the elements of their prefix field
/// and are never settable columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldAst {
    /// Field path.
    pub name: String,
    /// Raw type expression (`string`, `option<record<user>>`, ...).
    #[serde(rename = "type")]
    pub ty: String,
    /// Schema validation relaxed for this field's shape.
    #[serde(default)]
    pub flex: bool,
    /// `DEFAULT` expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// `VALUE` expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `ASSERT` expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<String>,
    /// `READONLY` flag.
    #[serde(default)]
    pub readonly: bool,
    /// Field-level permissions.
    #[serde(default)]
    pub permissions: Permissions,
}

impl FieldAst {
    /// Creates a field with the given path and type expression.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_assert(mut self, assert: impl Into<String>) -> Self {
        self.assert = Some(assert.into());
        self
    }

    #[must_use]
    pub fn flexible(mut self) -> Self {
        self.flex = true;
        self
    }

    /// Returns `true` if the path ends in a wildcard segment.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        is_wildcard_path(&self.name)
    }

    /// Returns `true` if the path has more than one segment.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        is_nested_path(&self.name)
    }
}

/// Rewrites every `[*]` segment as `.*` so both spellings compare equal.
#[must_use]
pub fn normalize_field_name(name: &str) -> String {
    name.replace("[*]", ".*")
}

/// Returns `true` for `a.*` and `a[*]`.
#[must_use]
pub fn is_wildcard_path(name: &str) -> bool {
    name.ends_with(".*") || name.ends_with("[*]")
}

/// Returns `true` for any path with more than one segment, wildcards included.
#[must_use]
pub fn is_nested_path(name: &str) -> bool {
    name.contains('.') || name.contains('[')
}

/// Returns the normalized parent path, or `None` for a top-level field.
///
/// ```
/// use schema_sync_core::ast::parent_path;
///
/// assert_eq!(parent_path("tags[*]").as_deref(), Some("tags"));
/// assert_eq!(parent_path("a.b.c").as_deref(), Some("a.b"));
/// assert_eq!(parent_path("name"), None);
/// ```
#[must_use]
pub fn parent_path(name: &str) -> Option<String> {
    let normalized = normalize_field_name(name);
    normalized
        .rfind('.')
        .map(|pos| normalized[..pos].to_string())
}
