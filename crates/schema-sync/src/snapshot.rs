//! A database client backed by a JSON snapshot.
//!
//! The snapshot holds the answers a SurrealDB instance would give to
//! `INFO FOR DB` and `INFO FOR TABLE`:
//!
//! ```json
//! {
//!   "database": { "tables": { "user": "DEFINE TABLE user TYPE NORMAL SCHEMAFULL" } },
//!   "tables": {
//!     "user": { "fields": { "email": "DEFINE FIELD email ON user TYPE string" } }
//!   }
//! }
//! ```
//!
//! Executed statements are recorded in memory, not applied to the snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use schema_sync_core::extract::{DatabaseClient, DatabaseInfo, TableInfo};

use crate::error::{CliError, Result};

/// Serialized `INFO FOR DB` / `INFO FOR TABLE` answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `INFO FOR DB`.
    #[serde(default)]
    pub database: DatabaseInfo,
    /// `INFO FOR TABLE` per table name.
    #[serde(default)]
    pub tables: BTreeMap<String, TableInfo>,
}

/// Errors returned by [`SnapshotClient`].
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot has no `INFO FOR TABLE` entry for the table.
    #[error("Table '{0}' is not in the snapshot")]
    TableNotFound(String),
}

/// [`DatabaseClient`] answering from a [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotClient {
    snapshot: Snapshot,
    executed: Mutex<Vec<String>>,
}

impl SnapshotClient {
    /// Creates a client for an in-memory snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Parses a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Reads a snapshot file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::SnapshotNotFound(path.to_path_buf()));
        }
        debug!(path = %path.display(), "Loading database snapshot");
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Returns the snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Statements passed to [`DatabaseClient::execute`] so far.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

impl DatabaseClient for SnapshotClient {
    type Error = SnapshotError;

    async fn info_for_db(&self) -> std::result::Result<DatabaseInfo, SnapshotError> {
        Ok(self.snapshot.database.clone())
    }

    async fn info_for_table(&self, table: &str) -> std::result::Result<TableInfo, SnapshotError> {
        self.snapshot
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| SnapshotError::TableNotFound(table.to_string()))
    }

    async fn execute(&self, statements: &[String]) -> std::result::Result<(), SnapshotError> {
        self.executed.lock().await.extend_from_slice(statements);
        Ok(())
    }
}
