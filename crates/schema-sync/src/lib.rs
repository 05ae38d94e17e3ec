//! Keeps declarative schema sources and a SurrealDB schema in sync.
//!
//! `schema-sync` is the shell around [`schema_sync_core`]: it loads the
//! database side from a JSON snapshot, applies migrations through a
//! [`DatabaseClient`](schema_sync_core::extract::DatabaseClient), and reads
//! and writes the generated schema directory.
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate or merge schema/*.rs from the database
//! schema-sync --snapshot db.json pull --code-schema code.json
//!
//! # Show what the database is missing
//! schema-sync --snapshot db.json diff --code-schema code.json
//!
//! # Write the migration script and apply it
//! schema-sync --snapshot db.json migrate --code-schema code.json --output migrations --apply
//!
//! # Report unsupported definitions in a script
//! schema-sync check schema.surql
//! ```

pub mod error;
pub mod executor;
pub mod files;
pub mod snapshot;

pub use error::{CliError, Result};
pub use executor::{ExecutorOptions, Migration, MigrationExecutor};
pub use files::{apply_file_changes, migration_file_name, read_code_schema, read_schema_dir};
pub use snapshot::{Snapshot, SnapshotClient};
