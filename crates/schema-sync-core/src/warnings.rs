//! Non-fatal findings collected while extracting a schema.
//!
//! A [`Warnings`] value is created by the caller, threaded through the
//! extraction call and handed back; nothing is stored globally.

use serde::Serialize;

/// What kind of problem a [`Warning`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A DEFINE statement did not match its expected structure.
    ParseFailure,
    /// A recognized construct that is not modeled (analyzer, function, ...).
    UnsupportedFeature,
    /// A definition references something that does not exist.
    StructuralMismatch,
    /// The database could not be queried for one table.
    IntrospectionFailure,
}

/// A single structured warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Warning category.
    pub kind: WarningKind,
    /// What the warning is about, e.g. `index user.idx_vec`.
    pub subject: String,
    /// Human-readable reason.
    pub reason: String,
    /// Suggested remediation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Warning {
    /// Creates a warning without a hint.
    #[must_use]
    pub fn new(kind: WarningKind, subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            reason: reason.into(),
            hint: None,
        }
    }

    /// Attaches a remediation hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.reason)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

/// An ordered collection of warnings owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and logs it.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, subject = %warning.subject, "{}", warning.reason);
        self.items.push(warning);
    }

    /// Records an unsupported-feature warning with a hint.
    pub fn unsupported(
        &mut self,
        subject: impl Into<String>,
        reason: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.push(Warning::new(WarningKind::UnsupportedFeature, subject, reason).with_hint(hint));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.items.iter()
    }

    /// Warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.items.iter().filter(move |w| w.kind == kind)
    }

    /// Appends every warning from `other`.
    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }
}

impl IntoIterator for Warnings {
    type Item = Warning;
    type IntoIter = std::vec::IntoIter<Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_filters_by_kind() {
        let mut warnings = Warnings::new();
        warnings.unsupported("analyzer simple", "Analyzers are not synced", "Define it manually");
        warnings.push(Warning::new(
            WarningKind::ParseFailure,
            "field user.x",
            "bad statement",
        ));

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings.of_kind(WarningKind::ParseFailure).count(), 1);
        assert_eq!(
            warnings.iter().next().unwrap().to_string(),
            "analyzer simple: Analyzers are not synced (Define it manually)"
        );
    }
}
