//! Four-slot permission expressions shared by tables and fields.

use serde::{Deserialize, Serialize};

/// One of the four permission slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    Select,
    Create,
    Update,
    Delete,
}

impl PermissionKind {
    /// All slots in rendering order.
    pub const ALL: [Self; 4] = [Self::Select, Self::Create, Self::Update, Self::Delete];

    /// Lower-case keyword as written after `FOR`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses a slot keyword, case-insensitively.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(word))
    }
}

/// Raw permission expressions (`FULL`, `NONE`, `WHERE ...`) per slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

impl Permissions {
    /// No slot set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Permissions::set`].
    #[must_use]
    pub fn with(mut self, kind: PermissionKind, expr: impl Into<String>) -> Self {
        self.set(kind, expr);
        self
    }

    /// The same expression on all four slots.
    #[must_use]
    pub fn all(expr: impl Into<String>) -> Self {
        let expr = expr.into();
        Self {
            select: Some(expr.clone()),
            create: Some(expr.clone()),
            update: Some(expr.clone()),
            delete: Some(expr),
        }
    }

    /// `PERMISSIONS FULL`.
    #[must_use]
    pub fn full() -> Self {
        Self::all("FULL")
    }

    /// `PERMISSIONS NONE`.
    #[must_use]
    pub fn none() -> Self {
        Self::all("NONE")
    }

    /// Returns the expression for one slot.
    #[must_use]
    pub fn get(&self, kind: PermissionKind) -> Option<&str> {
        match kind {
            PermissionKind::Select => self.select.as_deref(),
            PermissionKind::Create => self.create.as_deref(),
            PermissionKind::Update => self.update.as_deref(),
            PermissionKind::Delete => self.delete.as_deref(),
        }
    }

    /// Sets the expression for one slot.
    pub fn set(&mut self, kind: PermissionKind, expr: impl Into<String>) {
        let slot = match kind {
            PermissionKind::Select => &mut self.select,
            PermissionKind::Create => &mut self.create,
            PermissionKind::Update => &mut self.update,
            PermissionKind::Delete => &mut self.delete,
        };
        *slot = Some(expr.into());
    }

    /// Returns `true` when no slot is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.select.is_none()
            && self.create.is_none()
            && self.update.is_none()
            && self.delete.is_none()
    }

    /// Returns the shared expression when all four slots hold the same one.
    #[must_use]
    pub fn uniform(&self) -> Option<&str> {
        let first = self.select.as_deref()?;
        PermissionKind::ALL
            .into_iter()
            .all(|kind| self.get(kind) == Some(first))
            .then_some(first)
    }

    /// Iterates over the slots that are set, in rendering order.
    pub fn iter(&self) -> impl Iterator<Item = (PermissionKind, &str)> {
        PermissionKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|expr| (kind, expr)))
    }
}
