//! Field builder expressions.
//!
//! The flat field list of a table is folded back into nested builders: a
//! dotted child of an object-typed field becomes an entry of its
//! `Field::object(..)`, and a wildcard child whose type matches its parent's
//! element type becomes the element of `Field::array(..)` / `Field::set(..)`.
//! Every other field, including dotted ones, is rendered as its own
//! top-level entry.

use crate::ast::{FieldAst, PermissionKind, Permissions, TableAst, normalize_field_name, parent_path};
use crate::diff::{element_type, is_object_type, normalize_type, split_top_level};

const INDENT: &str = "    ";

/// Scalar types with a dedicated `Field` constructor.
const SCALARS: &[&str] = &[
    "any", "bool", "bytes", "datetime", "decimal", "duration", "float", "int", "number", "string",
    "uuid",
];

/// Returns `true` if `field` is rendered inside its parent's builder.
pub(crate) fn is_absorbed(table: &TableAst, field: &FieldAst) -> bool {
    let Some(parent) = parent_path(&field.name) else {
        return false;
    };
    let Some(parent) = table.field_normalized(&parent) else {
        return false;
    };
    if field.is_wildcard() {
        element_type(&parent.ty).is_some_and(|element| element == normalize_type(&field.ty))
    } else {
        is_object_type(&parent.ty)
    }
}

fn is_child_of(table: &TableAst, child: &FieldAst, parent: &FieldAst) -> bool {
    parent_path(&child.name).is_some_and(|p| p == normalize_field_name(&parent.name))
        && is_absorbed(table, child)
}

/// Fields rendered as top-level entries of the model, in table order.
pub(crate) fn top_level(table: &TableAst) -> impl Iterator<Item = &FieldAst> {
    table.fields.iter().filter(|f| !is_absorbed(table, f))
}

/// Renders `("name", <builder>)` with every line prefixed by `indent`.
pub(crate) fn render_entry(table: &TableAst, field: &FieldAst, indent: &str) -> String {
    format!(
        "{indent}({:?}, {})",
        field.name,
        render_builder(table, field, indent)
    )
}

/// Renders the builder expression of one field. Continuation lines are
/// indented relative to `indent`.
pub(crate) fn render_builder(table: &TableAst, field: &FieldAst, indent: &str) -> String {
    let nest = Nest {
        table,
        children: table
            .fields
            .iter()
            .filter(|c| !c.is_wildcard() && is_child_of(table, c, field))
            .collect(),
        element: table
            .fields
            .iter()
            .find(|c| c.is_wildcard() && is_child_of(table, c, field)),
        stray_element: table.fields.iter().any(|c| {
            c.is_wildcard()
                && parent_path(&c.name).is_some_and(|p| p == normalize_field_name(&field.name))
                && !is_absorbed(table, c)
        }),
    };

    let mut out = type_builder(&normalize_type(&field.ty), &nest, indent);
    if field.flex {
        out.push_str(".flexible()");
    }
    if let Some(value) = &field.value {
        out.push_str(&format!(".value({value:?})"));
    }
    if let Some(assert) = &field.assert {
        out.push_str(&format!(".assert({assert:?})"));
    }
    if let Some(default) = &field.default {
        out.push_str(&format!(".default({default:?})"));
    }
    if field.readonly {
        out.push_str(".readonly()");
    }
    if let Some(permissions) = render_permissions(&field.permissions) {
        out.push_str(&format!(".permissions({permissions})"));
    }
    out
}

/// Renders a `Permissions` expression, or `None` when nothing is set.
pub(crate) fn render_permissions(permissions: &Permissions) -> Option<String> {
    if permissions.is_empty() {
        return None;
    }
    Some(match permissions.uniform() {
        Some("FULL") => "Permissions::full()".to_string(),
        Some("NONE") => "Permissions::none()".to_string(),
        Some(expr) => format!("Permissions::all({expr:?})"),
        None => {
            let mut out = "Permissions::new()".to_string();
            for (kind, expr) in permissions.iter() {
                out.push_str(&format!(".with(PermissionKind::{}, {expr:?})", kind_name(kind)));
            }
            out
        }
    })
}

const fn kind_name(kind: PermissionKind) -> &'static str {
    match kind {
        PermissionKind::Select => "Select",
        PermissionKind::Create => "Create",
        PermissionKind::Update => "Update",
        PermissionKind::Delete => "Delete",
    }
}

struct Nest<'a> {
    table: &'a TableAst,
    children: Vec<&'a FieldAst>,
    element: Option<&'a FieldAst>,
    stray_element: bool,
}

impl Nest<'_> {
    fn leaf<'a>(table: &'a TableAst) -> Nest<'a> {
        Nest {
            table,
            children: Vec::new(),
            element: None,
            stray_element: false,
        }
    }
}

/// Builder for a normalized type expression.
fn type_builder(ty: &str, nest: &Nest<'_>, indent: &str) -> String {
    if let Some(inner) = ty.strip_prefix("option<").and_then(|r| r.strip_suffix('>')) {
        return format!("Field::option({})", type_builder(inner, nest, indent));
    }
    if ty == "object" {
        return object_builder(nest, indent);
    }
    if let Some(container) = ["array", "set"].into_iter().find(|c| is_container(ty, c)) {
        if let Some(builder) = container_builder(container, ty, nest, indent) {
            return builder;
        }
        return custom(ty);
    }
    if SCALARS.contains(&ty) {
        return format!("Field::{ty}()");
    }
    if let Some(tables) = ty.strip_prefix("record<").and_then(|r| r.strip_suffix('>')) {
        let tables: Vec<String> = split_top_level(tables, '|')
            .into_iter()
            .map(|t| format!("{t:?}"))
            .collect();
        return format!("Field::record([{}])", tables.join(", "));
    }
    if let Some(kind) = ty.strip_prefix("geometry<").and_then(|r| r.strip_suffix('>')) {
        if kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return format!("Field::geometry({kind:?})");
        }
    }
    custom(ty)
}

fn custom(ty: &str) -> String {
    format!("Field::custom({ty:?})")
}

fn is_container(ty: &str, container: &str) -> bool {
    ty == container
        || ty
            .strip_prefix(container)
            .is_some_and(|rest| rest.starts_with('<') && rest.ends_with('>'))
}

fn container_builder(container: &str, ty: &str, nest: &Nest<'_>, indent: &str) -> Option<String> {
    let args = ty
        .strip_prefix(container)
        .and_then(|r| r.strip_prefix('<'))
        .and_then(|r| r.strip_suffix('>'))
        .map(|inner| split_top_level(inner, ','))
        .unwrap_or_default();

    // An element constraint that disagrees with the container type stays a
    // separate entry, so the container keeps its exact spelling.
    if nest.element.is_none() && nest.stray_element {
        return None;
    }

    let element = match nest.element {
        Some(element) => render_builder(nest.table, element, indent),
        None => type_builder(
            args.first().copied().unwrap_or("any"),
            &Nest::leaf(nest.table),
            indent,
        ),
    };
    match args.get(1) {
        None => Some(format!("Field::{container}({element})")),
        Some(max) => max
            .parse::<u64>()
            .ok()
            .map(|max| format!("Field::{container}_max({element}, {max})")),
    }
}

fn object_builder(nest: &Nest<'_>, indent: &str) -> String {
    if nest.children.is_empty() {
        return "Field::object(vec![])".to_string();
    }
    let inner = format!("{indent}{INDENT}");
    let mut out = "Field::object(vec![\n".to_string();
    for child in &nest.children {
        let name = child.name.rsplit('.').next().unwrap_or(&child.name);
        out.push_str(&format!(
            "{inner}({name:?}, {}),\n",
            render_builder(nest.table, child, &inner)
        ));
    }
    out.push_str(&format!("{indent}])"));
    out
}
