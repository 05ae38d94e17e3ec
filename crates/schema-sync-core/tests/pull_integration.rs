//! Integration tests for the database-to-code direction.
//!
//! `fixtures/user.rs` is both compiled as a module and read as text: it is
//! exactly what the generator emits for the introspected `user` table, so
//! the same file checks code generation, code-side extraction and merging.

use std::collections::{BTreeMap, HashMap};

use pretty_assertions::assert_eq;
use schema_sync_core::ast::{FieldAst, IndexAst, SchemaAst, TableAst};
use schema_sync_core::codegen::render_table_source;
use schema_sync_core::diff::tables_equivalent;
use schema_sync_core::extract::{
    DatabaseClient, DatabaseInfo, TableInfo, extract_code_schema, introspect, parse_script,
};
use schema_sync_core::merge::{MergeOptions, merge};
use schema_sync_core::model::{Definition, Field, Model};
use schema_sync_core::plan::{FileAction, PlanOptions, plan};

#[path = "fixtures/user.rs"]
mod user;

const USER_SOURCE: &str = include_str!("fixtures/user.rs");

// =============================================================================
// A database that answers from fixed INFO maps
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("table not found")]
struct NotFound;

#[derive(Default)]
struct FixedDatabase {
    db: DatabaseInfo,
    tables: HashMap<String, TableInfo>,
}

impl DatabaseClient for FixedDatabase {
    type Error = NotFound;

    async fn info_for_db(&self) -> Result<DatabaseInfo, NotFound> {
        Ok(self.db.clone())
    }

    async fn info_for_table(&self, table: &str) -> Result<TableInfo, NotFound> {
        self.tables.get(table).cloned().ok_or(NotFound)
    }

    async fn execute(&self, _statements: &[String]) -> Result<(), NotFound> {
        Ok(())
    }
}

fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn database() -> FixedDatabase {
    let mut database = FixedDatabase::default();
    database.db.tables = map(&[(
        "user",
        "DEFINE TABLE user TYPE NORMAL SCHEMAFULL PERMISSIONS FOR select FULL, FOR update WHERE id = $auth.id",
    )]);
    database.tables.insert(
        "user".to_string(),
        TableInfo {
            fields: map(&[
                ("address", "DEFINE FIELD address ON user TYPE option<object>"),
                ("address.city", "DEFINE FIELD address.city ON user TYPE string"),
                ("address.zip", "DEFINE FIELD address.zip ON user TYPE int"),
                ("age", "DEFINE FIELD age ON user TYPE option<int>"),
                (
                    "created_at",
                    "DEFINE FIELD created_at ON user TYPE datetime READONLY VALUE time::now()",
                ),
                (
                    "email",
                    "DEFINE FIELD email ON user TYPE string ASSERT string::is::email($value)",
                ),
                ("tags", "DEFINE FIELD tags ON user TYPE array<string>"),
                ("tags[*]", "DEFINE FIELD tags[*] ON user TYPE string"),
            ]),
            indexes: map(&[("idx_email", "DEFINE INDEX idx_email ON user FIELDS email UNIQUE")]),
            events: map(&[(
                "audit",
                "DEFINE EVENT audit ON user WHEN $event = 'UPDATE' THEN (CREATE log SET user = $value.id)",
            )]),
        },
    );
    database
}

fn introspected() -> SchemaAst {
    let (schema, warnings) = tokio_test::block_on(introspect(&database())).unwrap();
    // The event is captured and reported.
    assert_eq!(warnings.len(), 1);
    assert_eq!(schema.table("user").unwrap().events.len(), 1);
    schema
}

fn code_schema() -> SchemaAst {
    let (schema, warnings) = extract_code_schema(&user::definitions());
    assert!(warnings.is_empty());
    schema
}

// =============================================================================
// Generation and extraction
// =============================================================================

#[test]
fn introspected_table_generates_the_fixture() {
    let schema = introspected();
    assert_eq!(render_table_source(schema.table("user").unwrap()), USER_SOURCE);
}

#[test]
fn generated_code_describes_the_database_table() {
    let database = introspected();
    let code = code_schema();
    assert!(tables_equivalent(
        database.table("user").unwrap(),
        code.table("user").unwrap()
    ));
    let index = code.table("user").unwrap().index("idx_email").unwrap();
    assert!(index.unique);
}

#[test]
fn bounded_sets_survive_code_and_database_sides() {
    let model = Model::normal("team").fields(vec![
        ("members", Field::set_max(Field::record(["user"]), 5)),
    ]);
    let definitions: Vec<Definition> = vec![model.into()];
    let (code, warnings) = extract_code_schema(&definitions);
    assert!(warnings.is_empty());
    let team = code.table("team").unwrap();
    assert_eq!(team.field("members").unwrap().ty, "set<record<user>, 5>");

    let database = parse_script(
        "DEFINE TABLE team TYPE NORMAL SCHEMAFULL;\nDEFINE FIELD members ON team TYPE set<record<user>, 5>;",
    )
    .unwrap();
    let database = database.table("team").unwrap();
    assert!(tables_equivalent(database, team));
    assert!(render_table_source(database)
        .contains("(\"members\", Field::set_max(Field::record([\"user\"]), 5)),"));
}

#[test]
fn empty_directory_gets_one_file_per_table() {
    let changes = plan(&introspected(), &BTreeMap::new(), None, &PlanOptions::new().with_index());
    let files: Vec<(&str, FileAction)> = changes.iter().map(|c| (c.file.as_str(), c.action)).collect();
    assert_eq!(files, [("user.rs", FileAction::Create), ("mod.rs", FileAction::Create)]);
    assert_eq!(changes[0].content.as_deref(), Some(USER_SOURCE));
}

// =============================================================================
// Merging into hand-edited files
// =============================================================================

/// The fixture with a hand-written helper and a reformatted entry.
fn hand_edited() -> String {
    USER_SOURCE
        .replace(
            "            (\"age\", Field::option(Field::int())),\n",
            "            // Age in years.\n            (\"age\",   Field::option(Field::int())),\n",
        )
        .replace(
            "pub fn definitions()",
            "/// Admins bypass row permissions.\npub fn is_admin(role: &str) -> bool {\n    role == \"admin\" // \"]\"\n}\n\npub fn definitions()",
        )
}

fn database_user() -> TableAst {
    introspected().table("user").unwrap().clone()
}

fn code_user() -> TableAst {
    code_schema().table("user").unwrap().clone()
}

#[test]
fn inserting_a_field_keeps_every_other_line() {
    let original = hand_edited();
    let database = database_user().with_field(FieldAst::new("nickname", "option<string>"));

    let result = merge(&original, &database, &code_user(), &MergeOptions::default());
    assert_eq!(result.added_fields, ["nickname"]);

    let inserted = "            // Added from database schema\n            (\"nickname\", Field::option(Field::string())),\n";
    assert!(result.text.contains(inserted));
    assert_eq!(result.text.replacen(inserted, "", 1), original);
}

#[test]
fn database_changes_are_merged_into_the_edited_file() {
    let original = hand_edited();
    let mut database = database_user().with_index(IndexAst::new("idx_age", ["age"]));
    database.fields.retain(|f| !f.name.starts_with("tags"));

    let options = MergeOptions::default().removed_marker("Dropped upstream");
    let result = merge(&original, &database, &code_user(), &options);

    assert_eq!(result.removed_fields, ["tags"]);
    assert_eq!(result.added_indexes, ["idx_age"]);
    assert!(result.skipped.is_empty());
    assert!(result.review.is_empty());
    assert!(result.text.contains(
        "            // Dropped upstream\n            // (\"tags\", Field::array(Field::string())),\n"
    ));
    assert!(result.text.contains("pub fn is_admin(role: &str) -> bool {\n    role == \"admin\" // \"]\"\n}\n"));
    assert!(result.text.contains(
        "}\n\n// Added from database schema\npub fn idx_age() -> IndexDef {\n    IndexDef::on(&model(), \"idx_age\").fields([\"age\"])\n}\n\npub fn definitions()"
    ));
    assert!(result
        .text
        .contains("    vec![model().into(), idx_email().into(), idx_age().into()]\n"));
    assert!(result.text.contains("            // Age in years.\n            (\"age\",   Field::option(Field::int())),\n"));
}

#[test]
fn planner_merges_when_the_code_schema_is_known() {
    let mut database = introspected();
    if let Some(table) = database.table_mut("user") {
        table.add_field(FieldAst::new("nickname", "option<string>"));
    }
    let existing: BTreeMap<String, String> = [("user.rs".to_string(), hand_edited())].into();

    let changes = plan(&database, &existing, Some(&code_schema()), &PlanOptions::new());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action, FileAction::Merge);
    assert_eq!(changes[0].notes, ["added field nickname"]);
    assert!(changes[0].content.as_deref().unwrap().contains("pub fn is_admin"));

    let unchanged = plan(&introspected(), &existing, Some(&code_schema()), &PlanOptions::new());
    assert!(unchanged.is_empty());
}
