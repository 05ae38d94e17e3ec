//! Parser error types.

/// The kind of DEFINE statement a parser function expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Table,
    Field,
    Index,
    Event,
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Table => "TABLE",
            Self::Field => "FIELD",
            Self::Index => "INDEX",
            Self::Event => "EVENT",
        })
    }
}

/// A DEFINE statement that does not match the expected structure.
///
/// Callers treat these as per-statement failures: the statement is skipped
/// with a warning and processing continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The statement's prefix, name or target does not match.
    #[error("Not a valid DEFINE {kind} statement: {statement}")]
    UnexpectedStatement {
        /// Expected statement kind.
        kind: DefinitionKind,
        /// The offending statement text.
        statement: String,
    },

    /// An index statement has neither a FIELDS nor a COLUMNS clause.
    #[error("Index '{name}' has no FIELDS or COLUMNS clause")]
    MissingColumns {
        /// Index name.
        name: String,
        /// The offending statement text.
        statement: String,
    },

    /// An event statement has no THEN clause.
    #[error("Event '{name}' has no THEN clause")]
    MissingThen {
        /// Event name.
        name: String,
        /// The offending statement text.
        statement: String,
    },
}

impl ParseError {
    pub(crate) fn unexpected(kind: DefinitionKind, statement: &str) -> Self {
        Self::UnexpectedStatement {
            kind,
            statement: statement.trim().to_string(),
        }
    }

    /// The statement text that failed to parse.
    #[must_use]
    pub fn statement(&self) -> &str {
        match self {
            Self::UnexpectedStatement { statement, .. }
            | Self::MissingColumns { statement, .. }
            | Self::MissingThen { statement, .. } => statement,
        }
    }
}
