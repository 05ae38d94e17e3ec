//! Error types for schema synchronization.

use crate::parser::{DefinitionKind, ParseError};

/// Errors returned by the fallible entry points of this crate.
///
/// Most problems found while reading a schema are not errors: they are
/// recorded as [`crate::warnings::Warning`]s and processing continues.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The database client failed on a query that cannot be skipped.
    #[error("Database query '{operation}' failed: {source}")]
    Database {
        /// The query or call that failed.
        operation: String,
        /// The client error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A statement could not be parsed in strict mode.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A field, index or event is defined on a table that does not exist.
    #[error("DEFINE {kind} '{name}' targets unknown table '{table}'")]
    OrphanDefinition {
        /// Statement kind.
        kind: DefinitionKind,
        /// Definition name.
        name: String,
        /// The missing table.
        table: String,
    },
}

impl SyncError {
    /// Wraps a client error for `operation`.
    pub fn database<E>(operation: impl Into<String>) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let operation = operation.into();
        move |source| Self::Database {
            operation,
            source: Box::new(source),
        }
    }
}

/// Result type for schema synchronization.
pub type Result<T> = std::result::Result<T, SyncError>;
