//! Schema extraction from code-side definitions.

use tracing::debug;

use crate::ast::{FieldAst, IndexAst, SchemaAst, TableAst};
use crate::model::{Definition, Field, Model};
use crate::warnings::{Warning, WarningKind, Warnings};

/// Flattens registered definitions into a schema.
///
/// Models are read first, then indexes are attached to their owning table.
/// An index on a table that is not registered, or a table registered twice,
/// produces a [`WarningKind::StructuralMismatch`] warning.
#[must_use]
pub fn extract_code_schema(definitions: &[Definition]) -> (SchemaAst, Warnings) {
    let mut warnings = Warnings::new();
    let mut schema = SchemaAst::new();

    for definition in definitions {
        if let Definition::Model(describer) = definition {
            let table = table_from_model(&describer.describe());
            if schema.table(&table.name).is_some() {
                warnings.push(Warning::new(
                    WarningKind::StructuralMismatch,
                    format!("table {}", table.name),
                    "Table is registered more than once; the last definition wins",
                ));
            }
            schema.add_table(table);
        }
    }

    for definition in definitions {
        if let Definition::Index(index) = definition {
            let Some(table) = schema.table_mut(index.table()) else {
                warnings.push(
                    Warning::new(
                        WarningKind::StructuralMismatch,
                        format!("index {}.{}", index.table(), index.name()),
                        format!("Table '{}' is not registered", index.table()),
                    )
                    .with_hint("Register the owning model alongside its indexes"),
                );
                continue;
            };
            let mut ast = IndexAst::new(index.name(), index.columns().iter().cloned());
            ast.unique = index.is_unique();
            table.add_index(ast);
        }
    }

    debug!(tables = schema.tables.len(), "Code schema extracted");
    (schema, warnings)
}

/// Converts one model into a flat table.
#[must_use]
pub fn table_from_model(model: &Model) -> TableAst {
    let mut table = TableAst::new(model.name(), model.kind());
    table.schemafull = model.is_schemafull();
    table.drop = model.is_dropped();
    table.view_query = model.view_query().map(str::to_string);
    table.permissions = model.permission_rules().clone();
    for (name, field) in model.declared_fields() {
        flatten(&mut table, name.clone(), field);
    }
    table
}

fn flatten(table: &mut TableAst, path: String, field: &Field) {
    table.add_field(field_ast(&path, field));
    if let Some(children) = field.children() {
        for (name, child) in children {
            flatten(table, format!("{path}.{name}"), child);
        }
    }
    if let Some(element) = field.element() {
        flatten(table, format!("{path}.*"), element);
    }
}

fn field_ast(path: &str, field: &Field) -> FieldAst {
    FieldAst {
        name: path.to_string(),
        ty: field.type_expr(),
        flex: field.is_flexible(),
        default: field.default_expr().map(str::to_string),
        value: field.value_expr().map(str::to_string),
        assert: field.assert_expr().map(str::to_string),
        readonly: field.is_readonly(),
        permissions: field.permission_rules().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IndexDef, Permissions, TableKind};

    fn user() -> Model {
        Model::normal("user")
            .permissions(Permissions::full())
            .fields(vec![
                ("email", Field::string()),
                (
                    "address",
                    Field::option(Field::object(vec![
                        ("street", Field::string()),
                        ("zip", Field::int()),
                    ])),
                ),
                ("tags", Field::array(Field::string())),
            ])
    }

    #[test]
    fn nested_fields_are_flattened_to_paths() {
        let (schema, warnings) = extract_code_schema(&[user().into()]);
        assert!(warnings.is_empty());

        let table = schema.table("user").unwrap();
        let names: Vec<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["email", "address", "address.street", "address.zip", "tags", "tags.*"]
        );
        assert_eq!(table.field("address").unwrap().ty, "option<object>");
        assert_eq!(table.field("tags.*").unwrap().ty, "string");
        assert_eq!(table.permissions, Permissions::full());
        assert_eq!(table.kind, TableKind::Normal);
    }

    #[test]
    fn indexes_attach_to_their_model() {
        let definitions: Vec<Definition> = vec![
            user().into(),
            IndexDef::on(&user(), "idx_email").fields(["email"]).unique().into(),
            IndexDef::new("idx_title", "post").fields(["title"]).into(),
        ];
        let (schema, warnings) = extract_code_schema(&definitions);

        let index = schema.table("user").unwrap().index("idx_email").unwrap();
        assert!(index.unique);
        assert_eq!(index.columns, ["email"]);
        assert_eq!(warnings.of_kind(WarningKind::StructuralMismatch).count(), 1);
    }

    #[test]
    fn field_modifiers_are_carried() {
        let model = Model::normal("post").fields(vec![(
            "status",
            Field::string()
                .default("'draft'")
                .assert("$value INSIDE ['draft', 'published']"),
        )]);
        let table = table_from_model(&model);
        let status = table.field("status").unwrap();
        assert_eq!(status.default.as_deref(), Some("'draft'"));
        assert_eq!(
            status.assert.as_deref(),
            Some("$value INSIDE ['draft', 'published']")
        );
    }
}
