//! Table `user`.
//!
//! Generated by schema-sync. Hand edits are kept when the file is merged.

#[allow(unused_imports)]
use schema_sync_core::model::{Definition, Field, IndexDef, Model, PermissionKind, Permissions};

pub fn model() -> Model {
    Model::normal("user")
        .permissions(Permissions::new().with(PermissionKind::Select, "FULL").with(PermissionKind::Update, "WHERE id = $auth.id"))
        .fields(vec![
            ("address", Field::option(Field::object(vec![
                ("city", Field::string()),
                ("zip", Field::int()),
            ]))),
            ("age", Field::option(Field::int())),
            ("created_at", Field::datetime().value("time::now()").readonly()),
            ("email", Field::string().assert("string::is::email($value)")),
            ("tags", Field::array(Field::string())),
        ])
}

pub fn idx_email() -> IndexDef {
    IndexDef::on(&model(), "idx_email").fields(["email"]).unique()
}

pub fn definitions() -> Vec<Definition> {
    vec![model().into(), idx_email().into()]
}
