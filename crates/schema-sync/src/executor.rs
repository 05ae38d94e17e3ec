//! Migration executor.
//!
//! Compares the code-side schema with the live database, renders the
//! statements that bring the database in line, and applies them in a single
//! transaction.

use tracing::{debug, info, warn};

use schema_sync_core::diff::{Change, Direction, compare};
use schema_sync_core::extract::{DatabaseClient, introspect};
use schema_sync_core::migrations::{render_all, wrap_in_transaction};
use schema_sync_core::{SchemaAst, SyncError, Warnings};

use crate::error::Result;

/// Options for [`MigrationExecutor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Render statements without applying them.
    pub dry_run: bool,
}

impl ExecutorOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// The changes between code and database and the statements for them.
#[derive(Debug, Clone, Default)]
pub struct Migration {
    /// Changes from the database towards the code schema.
    pub changes: Vec<Change>,
    /// Rendered statements, in change order.
    pub statements: Vec<String>,
    /// Warnings collected while reading the database.
    pub warnings: Warnings,
}

impl Migration {
    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The statements wrapped in one transaction.
    #[must_use]
    pub fn script(&self) -> String {
        wrap_in_transaction(&self.statements)
    }
}

/// Plans and applies migrations against a database.
pub struct MigrationExecutor<C: DatabaseClient> {
    client: C,
    options: ExecutorOptions,
}

impl<C: DatabaseClient> MigrationExecutor<C> {
    /// Creates a new migration executor.
    pub fn new(client: C) -> Self {
        Self {
            client,
            options: ExecutorOptions::default(),
        }
    }

    /// Sets the executor options.
    #[must_use]
    pub const fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Introspects the database and renders the statements that turn it into
    /// `code`.
    pub async fn plan(&self, code: &SchemaAst) -> Result<Migration> {
        let (database, warnings) = introspect(&self.client).await?;
        let changes = compare(code, &database, Direction::Push);
        let statements = render_all(&changes, code, &database);

        if statements.len() < changes.len() {
            warn!(
                changes = changes.len(),
                statements = statements.len(),
                "Some changes render no statement"
            );
        }
        info!(
            changes = changes.len(),
            statements = statements.len(),
            "Migration planned"
        );
        Ok(Migration {
            changes,
            statements,
            warnings,
        })
    }

    /// Applies a planned migration in one transaction.
    ///
    /// Returns the number of statements applied; zero in dry-run mode.
    pub async fn apply(&self, migration: &Migration) -> Result<usize> {
        if migration.is_empty() {
            info!("Database schema is up to date");
            return Ok(0);
        }

        for statement in &migration.statements {
            debug!(statement = %statement, "Migration statement");
        }

        if self.options.dry_run {
            info!(
                statements = migration.statements.len(),
                "Dry run, nothing applied"
            );
            return Ok(0);
        }

        self.client
            .execute(&[migration.script()])
            .await
            .map_err(SyncError::database("apply migration"))?;

        info!(
            statements = migration.statements.len(),
            "Migration applied successfully"
        );
        Ok(migration.statements.len())
    }
}
