//! Type-expression normalization used for comparison.
//!
//! The canonical form drops all whitespace and rewrites every union that
//! contains `none` as `option<...>`, so `option<string>`, `none | string`
//! and `string|none` all compare equal; `array<any>` collapses to `array`.
//! It is only used for equality checks; changes always report the original
//! spelling.

/// Splits `text` on `sep` where no bracket is open.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Returns the canonical form of a type expression.
#[must_use]
pub fn normalize_type(ty: &str) -> String {
    let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
    normalize_union(&compact)
}

fn normalize_union(text: &str) -> String {
    let mut parts: Vec<String> = split_top_level(text, '|')
        .into_iter()
        .map(normalize_term)
        .collect();
    if parts.len() > 1 && parts.iter().any(|p| p == "none") {
        parts.retain(|p| p != "none");
        return format!("option<{}>", parts.join("|"));
    }
    parts.join("|")
}

fn normalize_term(term: &str) -> String {
    match (term.find('<'), term.ends_with('>')) {
        (Some(open), true) => {
            let args: Vec<String> = split_top_level(&term[open + 1..term.len() - 1], ',')
                .into_iter()
                .map(normalize_union)
                .collect();
            let name = &term[..open];
            // `array<any>` and `set<any>` are the bare container types.
            if matches!(name, "array" | "set") && args.len() == 1 && args[0] == "any" {
                return name.to_string();
            }
            format!("{name}<{}>", args.join(","))
        }
        _ => term.to_string(),
    }
}

/// Strips any number of `option<...>` wrappers from a normalized type.
fn unwrap_option(normalized: &str) -> &str {
    let mut current = normalized;
    while let Some(inner) = current
        .strip_prefix("option<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        current = inner;
    }
    current
}

/// The normalized element type implied by an `array<T>` / `set<T>` type.
///
/// A bare `array` or `set` implies `any`. Returns `None` for every other
/// type.
#[must_use]
pub fn element_type(ty: &str) -> Option<String> {
    let normalized = normalize_type(ty);
    let base = unwrap_option(&normalized);
    if base == "array" || base == "set" {
        return Some("any".to_string());
    }
    let inner = base
        .strip_prefix("array<")
        .or_else(|| base.strip_prefix("set<"))?
        .strip_suffix('>')?;
    split_top_level(inner, ',')
        .first()
        .map(|first| (*first).to_string())
}

/// Returns `true` if the normalized type is an object, optionally wrapped.
#[must_use]
pub fn is_object_type(ty: &str) -> bool {
    unwrap_option(&normalize_type(ty)) == "object"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_and_none_union_are_equivalent() {
        assert_eq!(normalize_type("option<string>"), normalize_type("none | string"));
        assert_eq!(normalize_type("string | none"), "option<string>");
        assert_eq!(
            normalize_type("option<record<user | team>>"),
            normalize_type("none | record<user|team>")
        );
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(normalize_type("array< string , 10 >"), "array<string,10>");
        assert_ne!(normalize_type("string"), normalize_type("int"));
        assert_eq!(normalize_type("array<any>"), "array");
    }

    #[test]
    fn nested_none_unions_are_normalized() {
        assert_eq!(
            normalize_type("array<none | string>"),
            "array<option<string>>"
        );
    }

    #[test]
    fn element_types() {
        assert_eq!(element_type("array<string>").as_deref(), Some("string"));
        assert_eq!(element_type("option<set<int, 5>>").as_deref(), Some("int"));
        assert_eq!(
            element_type("array<record<user>>").as_deref(),
            Some("record<user>")
        );
        assert_eq!(element_type("array").as_deref(), Some("any"));
        assert_eq!(element_type("object"), None);
    }

    #[test]
    fn object_detection() {
        assert!(is_object_type("object"));
        assert!(is_object_type("option<object>"));
        assert!(is_object_type("none | object"));
        assert!(!is_object_type("array<object>"));
    }
}
