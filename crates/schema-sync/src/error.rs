//! Error types for the command-line shell.

use std::path::PathBuf;

use schema_sync_core::SyncError;

/// Errors that can occur while loading schemas or writing files.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Schema reading, parsing or database access failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// IO error (reading snapshots, reading or writing schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database snapshot file does not exist.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    /// A planned file name would leave the schema directory.
    #[error("Refusing to write '{0}': file names must not contain path separators")]
    InvalidFileName(String),

    /// A file marked for writing carries no content.
    #[error("No content planned for '{0}'")]
    MissingContent(String),
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, CliError>;
