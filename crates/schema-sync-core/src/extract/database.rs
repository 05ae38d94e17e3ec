//! Database introspection.
//!
//! The live database is an opaque collaborator behind [`DatabaseClient`]:
//! it answers `INFO FOR DB` and `INFO FOR TABLE` with maps from definition
//! name to raw DEFINE statement text, and applies batches of statements.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::SchemaAst;
use crate::error::{Result, SyncError};
use crate::parser::{parse_event, parse_field, parse_index, parse_table};
use crate::warnings::{Warning, WarningKind, Warnings};

use super::{parse_failure, record_event, record_field, record_index, record_unsupported};

/// Result of `INFO FOR DB`: definition name to DEFINE statement per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default)]
    pub tables: BTreeMap<String, String>,
    #[serde(default)]
    pub analyzers: BTreeMap<String, String>,
    #[serde(default)]
    pub functions: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub accesses: BTreeMap<String, String>,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

/// Result of `INFO FOR TABLE <name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub indexes: BTreeMap<String, String>,
    #[serde(default)]
    pub events: BTreeMap<String, String>,
}

/// The database operations schema synchronization needs.
///
/// Implementations own the connection; cancellation is done by dropping the
/// returned future. Implementations may use `async fn`; the futures must be
/// `Send` so introspection can run on a multi-threaded runtime.
pub trait DatabaseClient: Send + Sync {
    /// Error type for client failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs `INFO FOR DB`.
    fn info_for_db(
        &self,
    ) -> impl Future<Output = std::result::Result<DatabaseInfo, Self::Error>> + Send;

    /// Runs `INFO FOR TABLE <table>`.
    fn info_for_table(
        &self,
        table: &str,
    ) -> impl Future<Output = std::result::Result<TableInfo, Self::Error>> + Send;

    /// Applies a batch of statements atomically.
    fn execute(
        &self,
        statements: &[String],
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;
}

/// Reads the full schema of the database behind `client`.
///
/// Tables are queried one at a time in name order. A table whose definition
/// does not parse, or whose `INFO FOR TABLE` query fails, is skipped with a
/// warning; malformed field, index and event statements are skipped the same
/// way.
///
/// # Errors
///
/// Returns [`SyncError::Database`] only if `INFO FOR DB` itself fails.
pub async fn introspect<C: DatabaseClient>(client: &C) -> Result<(SchemaAst, Warnings)> {
    let info = client
        .info_for_db()
        .await
        .map_err(SyncError::database("INFO FOR DB"))?;

    let mut warnings = Warnings::new();
    report_database_features(&info, &mut warnings);

    let mut schema = SchemaAst::new();
    for (name, definition) in &info.tables {
        let mut table = match parse_table(definition) {
            Ok(table) => table,
            Err(err) => {
                parse_failure(&mut warnings, format!("table {name}"), &err);
                continue;
            }
        };

        debug!(table = %table.name, "Introspecting table");
        let details = match client.info_for_table(&table.name).await {
            Ok(details) => details,
            Err(err) => {
                warnings.push(
                    Warning::new(
                        WarningKind::IntrospectionFailure,
                        format!("table {name}"),
                        format!("INFO FOR TABLE failed: {err}"),
                    )
                    .with_hint("The table was skipped"),
                );
                continue;
            }
        };

        for (field_name, statement) in &details.fields {
            match parse_field(statement) {
                Ok(field) => record_field(&mut table, field, &mut warnings),
                Err(err) => parse_failure(&mut warnings, format!("field {name}.{field_name}"), &err),
            }
        }
        for (index_name, statement) in &details.indexes {
            match parse_index(statement) {
                Ok(index) => record_index(&mut table, index, &mut warnings),
                Err(err) => parse_failure(&mut warnings, format!("index {name}.{index_name}"), &err),
            }
        }
        for (event_name, statement) in &details.events {
            match parse_event(statement) {
                Ok(event) => record_event(&mut table, event, &mut warnings),
                Err(err) => parse_failure(&mut warnings, format!("event {name}.{event_name}"), &err),
            }
        }

        debug!(
            table = %table.name,
            fields = table.fields.len(),
            indexes = table.indexes.len(),
            "Table introspected"
        );
        schema.add_table(table);
    }

    info!(
        tables = schema.tables.len(),
        warnings = warnings.len(),
        "Introspection complete"
    );
    Ok((schema, warnings))
}

fn report_database_features(info: &DatabaseInfo, warnings: &mut Warnings) {
    let groups = [
        ("ANALYZER", &info.analyzers),
        ("FUNCTION", &info.functions),
        ("PARAM", &info.params),
        ("ACCESS", &info.accesses),
        ("USER", &info.users),
    ];
    for (keyword, definitions) in groups {
        for name in definitions.keys() {
            record_unsupported(warnings, keyword, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection lost")]
    struct Lost;

    #[derive(Default)]
    struct Fake {
        db: DatabaseInfo,
        tables: HashMap<String, TableInfo>,
    }

    impl DatabaseClient for Fake {
        type Error = Lost;

        async fn info_for_db(&self) -> std::result::Result<DatabaseInfo, Lost> {
            Ok(self.db.clone())
        }

        async fn info_for_table(&self, table: &str) -> std::result::Result<TableInfo, Lost> {
            self.tables.get(table).cloned().ok_or(Lost)
        }

        async fn execute(&self, _statements: &[String]) -> std::result::Result<(), Lost> {
            Ok(())
        }
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn introspection_future_is_send() {
        let fake = Fake::default();
        assert_send(introspect(&fake));
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn failing_table_query_skips_only_that_table() {
        let mut fake = Fake::default();
        fake.db.tables = map(&[
            ("post", "DEFINE TABLE post TYPE NORMAL SCHEMAFULL"),
            ("user", "DEFINE TABLE user TYPE NORMAL SCHEMAFULL"),
        ]);
        fake.tables.insert(
            "user".to_string(),
            TableInfo {
                fields: map(&[("email", "DEFINE FIELD email ON user TYPE string")]),
                ..TableInfo::default()
            },
        );

        let (schema, warnings) = tokio_test::block_on(introspect(&fake)).unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert!(schema.table("user").unwrap().field("email").is_some());
        assert_eq!(
            warnings.of_kind(WarningKind::IntrospectionFailure).count(),
            1
        );
    }

    #[test]
    fn malformed_definitions_become_warnings() {
        let mut fake = Fake::default();
        fake.db.tables = map(&[("user", "DEFINE TABLE user SCHEMAFULL")]);
        fake.db.functions = map(&[("fn::greet", "DEFINE FUNCTION fn::greet() { RETURN 1; }")]);
        fake.tables.insert(
            "user".to_string(),
            TableInfo {
                fields: map(&[("bad", "DEFINE FIELD ON user TYPE string")]),
                indexes: map(&[("idx_bad", "DEFINE INDEX idx_bad ON user")]),
                ..TableInfo::default()
            },
        );

        let (schema, warnings) = tokio_test::block_on(introspect(&fake)).unwrap();
        let user = schema.table("user").unwrap();
        assert!(user.fields.is_empty());
        assert!(user.indexes.is_empty());
        assert_eq!(warnings.of_kind(WarningKind::ParseFailure).count(), 2);
        assert_eq!(warnings.of_kind(WarningKind::UnsupportedFeature).count(), 1);
    }
}
