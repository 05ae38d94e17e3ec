//! Field builders for code-side models.

use crate::ast::Permissions;

/// The shape of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A named scalar type such as `string` or `datetime`.
    Scalar(String),
    /// A record link to one or more tables.
    Record(Vec<String>),
    /// `option<T>`.
    Option(Box<Field>),
    /// `array<T>` with an optional maximum length.
    Array {
        element: Box<Field>,
        max: Option<u64>,
    },
    /// `set<T>` with an optional maximum length.
    Set {
        element: Box<Field>,
        max: Option<u64>,
    },
    /// An object with declared sub-fields.
    Object(Vec<(String, Field)>),
    /// Any other type expression, kept verbatim.
    Custom(String),
}

/// A field declaration in a code-side model.
///
/// ```
/// use schema_sync_core::model::Field;
///
/// let tags = Field::array(Field::string()).default("[]");
/// assert_eq!(tags.type_expr(), "array<string>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    kind: FieldKind,
    flexible: bool,
    default: Option<String>,
    value: Option<String>,
    assert: Option<String>,
    readonly: bool,
    permissions: Permissions,
}

macro_rules! scalar_constructors {
    ($($name:ident => $ty:literal),* $(,)?) => {
        $(
            #[doc = concat!("A `", $ty, "` field.")]
            #[must_use]
            pub fn $name() -> Self {
                Self::of(FieldKind::Scalar($ty.to_string()))
            }
        )*
    };
}

impl Field {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            flexible: false,
            default: None,
            value: None,
            assert: None,
            readonly: false,
            permissions: Permissions::default(),
        }
    }

    scalar_constructors! {
        any => "any",
        bool => "bool",
        bytes => "bytes",
        datetime => "datetime",
        decimal => "decimal",
        duration => "duration",
        float => "float",
        int => "int",
        number => "number",
        string => "string",
        uuid => "uuid",
    }

    /// A `geometry<kind>` field.
    #[must_use]
    pub fn geometry(kind: &str) -> Self {
        Self::of(FieldKind::Custom(format!("geometry<{kind}>")))
    }

    /// A `record<a | b>` link field.
    #[must_use]
    pub fn record<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(FieldKind::Record(tables.into_iter().map(Into::into).collect()))
    }

    /// An optional field.
    #[must_use]
    pub fn option(inner: Self) -> Self {
        Self::of(FieldKind::Option(Box::new(inner)))
    }

    /// An array of `element`.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::of(FieldKind::Array {
            element: Box::new(element),
            max: None,
        })
    }

    /// An array of `element` with at most `max` items.
    #[must_use]
    pub fn array_max(element: Self, max: u64) -> Self {
        Self::of(FieldKind::Array {
            element: Box::new(element),
            max: Some(max),
        })
    }

    /// A set of `element`.
    #[must_use]
    pub fn set(element: Self) -> Self {
        Self::of(FieldKind::Set {
            element: Box::new(element),
            max: None,
        })
    }

    /// A set of `element` with at most `max` items.
    #[must_use]
    pub fn set_max(element: Self, max: u64) -> Self {
        Self::of(FieldKind::Set {
            element: Box::new(element),
            max: Some(max),
        })
    }

    /// An object with the given sub-fields.
    #[must_use]
    pub fn object(fields: Vec<(&str, Self)>) -> Self {
        Self::of(FieldKind::Object(
            fields
                .into_iter()
                .map(|(name, field)| (name.to_string(), field))
                .collect(),
        ))
    }

    /// A field with a verbatim type expression.
    #[must_use]
    pub fn custom(ty: impl Into<String>) -> Self {
        Self::of(FieldKind::Custom(ty.into()))
    }

    #[must_use]
    pub fn flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    #[must_use]
    pub fn value(mut self, expr: impl Into<String>) -> Self {
        self.value = Some(expr.into());
        self
    }

    #[must_use]
    pub fn assert(mut self, expr: impl Into<String>) -> Self {
        self.assert = Some(expr.into());
        self
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    #[must_use]
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_flexible(&self) -> bool {
        self.flexible
    }

    #[must_use]
    pub fn default_expr(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn value_expr(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn assert_expr(&self) -> Option<&str> {
        self.assert.as_deref()
    }

    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.readonly
    }

    #[must_use]
    pub const fn permission_rules(&self) -> &Permissions {
        &self.permissions
    }

    /// The SurrealQL type expression of this field.
    #[must_use]
    pub fn type_expr(&self) -> String {
        match &self.kind {
            FieldKind::Scalar(ty) | FieldKind::Custom(ty) => ty.clone(),
            FieldKind::Record(tables) if tables.is_empty() => "record".to_string(),
            FieldKind::Record(tables) => format!("record<{}>", tables.join(" | ")),
            FieldKind::Option(inner) => format!("option<{}>", inner.type_expr()),
            FieldKind::Array { element, max } => container("array", element, *max),
            FieldKind::Set { element, max } => container("set", element, *max),
            FieldKind::Object(_) => "object".to_string(),
        }
    }

    /// The element field of an array or set, looking through `option`.
    #[must_use]
    pub fn element(&self) -> Option<&Self> {
        match &self.kind {
            FieldKind::Option(inner) => inner.element(),
            FieldKind::Array { element, .. } | FieldKind::Set { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The sub-fields of an object, looking through `option`.
    #[must_use]
    pub fn children(&self) -> Option<&[(String, Self)]> {
        match &self.kind {
            FieldKind::Option(inner) => inner.children(),
            FieldKind::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

fn container(name: &str, element: &Field, max: Option<u64>) -> String {
    match max {
        Some(max) => format!("{name}<{}, {max}>", element.type_expr()),
        None => format!("{name}<{}>", element.type_expr()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_expressions() {
        assert_eq!(Field::string().type_expr(), "string");
        assert_eq!(Field::option(Field::int()).type_expr(), "option<int>");
        assert_eq!(
            Field::record(["user", "team"]).type_expr(),
            "record<user | team>"
        );
        assert_eq!(
            Field::array_max(Field::record(["tag"]), 10).type_expr(),
            "array<record<tag>, 10>"
        );
        assert_eq!(Field::set(Field::string()).type_expr(), "set<string>");
        assert_eq!(Field::geometry("point").type_expr(), "geometry<point>");
        assert_eq!(
            Field::object(vec![("a", Field::int())]).type_expr(),
            "object"
        );
    }

    #[test]
    fn structure_is_visible_through_option() {
        let field = Field::option(Field::object(vec![("city", Field::string())]));
        assert_eq!(field.children().map(<[_]>::len), Some(1));

        let list = Field::option(Field::array(Field::string()));
        assert_eq!(list.element().map(Field::type_expr).as_deref(), Some("string"));
    }

    #[test]
    fn modifiers() {
        let field = Field::string()
            .default("'draft'")
            .assert("$value != NONE")
            .readonly()
            .flexible();
        assert_eq!(field.default_expr(), Some("'draft'"));
        assert_eq!(field.assert_expr(), Some("$value != NONE"));
        assert!(field.is_readonly());
        assert!(field.is_flexible());
    }
}
