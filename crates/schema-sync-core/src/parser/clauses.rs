//! Keyword-terminated clause extraction.
//!
//! Clause bodies are free-form text (type expressions contain nested angle
//! brackets and pipes), so instead of a grammar each clause is read lazily
//! from its keyword up to the nearest following clause keyword. Keywords
//! only count when they are upper-case and stand alone between whitespace,
//! commas or the statement end, which keeps `$value` from terminating a
//! `VALUE` clause.
//!
//! A keyword that appears verbatim inside a string literal (for example
//! `DEFAULT 'a VALUE b'`) still terminates the clause.

use crate::ast::{PermissionKind, Permissions};

fn is_boundary(c: Option<char>) -> bool {
    c.is_none_or(|c| c.is_whitespace() || c == ',' || c == ';')
}

/// Every standalone occurrence of `keyword` in `text`, as byte offsets.
pub(crate) fn keyword_positions<'a>(
    text: &'a str,
    keyword: &'a str,
) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(keyword).filter_map(move |(pos, _)| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + keyword.len()..].chars().next();
        (is_boundary(before) && is_boundary(after)).then_some(pos)
    })
}

/// First standalone occurrence of `keyword`.
pub(crate) fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    keyword_positions(text, keyword).next()
}

/// Returns `true` if the standalone keyword appears anywhere in `text`.
pub(crate) fn has_keyword(text: &str, keyword: &str) -> bool {
    find_keyword(text, keyword).is_some()
}

/// Strips whitespace and a trailing statement terminator.
pub(crate) fn clean(text: &str) -> &str {
    text.trim().trim_end_matches(';').trim_end()
}

/// Extracts the body of `keyword`, stopping at the nearest terminator.
///
/// Returns `None` if the keyword is absent or its body is empty.
pub(crate) fn clause<'a>(text: &'a str, keyword: &str, terminators: &[&str]) -> Option<&'a str> {
    let start = find_keyword(text, keyword)? + keyword.len();
    let rest = &text[start..];
    let end = terminators
        .iter()
        .filter(|t| **t != keyword)
        .filter_map(|t| find_keyword(rest, t))
        .min()
        .unwrap_or(rest.len());
    let body = clean(&rest[..end]);
    (!body.is_empty()).then_some(body)
}

/// Parses the `PERMISSIONS` clause of a table or field statement.
///
/// Accepts the `FULL` / `NONE` shorthand, individual
/// `FOR select <expr>` clauses, and the grouped form printed by the
/// database (`FOR create, update, delete NONE`).
pub(crate) fn parse_permissions(text: &str) -> Permissions {
    let mut permissions = Permissions::default();
    let Some(start) = find_keyword(text, "PERMISSIONS") else {
        return permissions;
    };
    let mut body = &text[start + "PERMISSIONS".len()..];
    if let Some(end) = find_keyword(body, "COMMENT") {
        body = &body[..end];
    }
    let body = clean(body);

    if body.eq_ignore_ascii_case("FULL") {
        return Permissions::full();
    }
    if body.eq_ignore_ascii_case("NONE") {
        return Permissions::none();
    }

    let starts: Vec<usize> = keyword_positions(body, "FOR").collect();
    for (i, &pos) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(body.len());
        let sub = body[pos + "FOR".len()..end]
            .trim()
            .trim_end_matches(',')
            .trim_end();
        apply_for_clause(sub, &mut permissions);
    }
    permissions
}

/// Applies one `FOR` sub-clause body (`select, update WHERE ...`).
fn apply_for_clause(body: &str, permissions: &mut Permissions) {
    let mut kinds = Vec::new();
    let mut rest = body;
    loop {
        let word_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let Some(kind) = PermissionKind::from_keyword(&rest[..word_end]) else {
            break;
        };
        kinds.push(kind);
        rest = rest[word_end..].trim_start();
        match rest.strip_prefix(',') {
            Some(after) => rest = after.trim_start(),
            None => break,
        }
    }

    let expr = rest.trim();
    if expr.is_empty() {
        return;
    }
    for kind in kinds {
        permissions.set(kind, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_requires_standalone_uppercase_word() {
        let text = "ASSERT $value != NONE VALUE $before";
        assert_eq!(find_keyword(text, "VALUE"), Some(22));
        assert!(!has_keyword("ASSERT $value > 0", "VALUE"));
        assert!(!has_keyword("DEFAULTS", "DEFAULT"));
    }

    #[test]
    fn clause_stops_at_nearest_terminator() {
        let text = "TYPE option<string> DEFAULT 'x' ASSERT $value != NONE;";
        assert_eq!(
            clause(text, "TYPE", &["DEFAULT", "ASSERT"]),
            Some("option<string>")
        );
        assert_eq!(
            clause(text, "ASSERT", &["DEFAULT", "ASSERT"]),
            Some("$value != NONE")
        );
        assert_eq!(clause(text, "VALUE", &["DEFAULT"]), None);
    }

    #[test]
    fn permissions_shorthand() {
        assert_eq!(
            parse_permissions("DEFINE TABLE t PERMISSIONS FULL"),
            Permissions::full()
        );
        assert_eq!(
            parse_permissions("DEFINE TABLE t PERMISSIONS NONE;"),
            Permissions::none()
        );
    }

    #[test]
    fn permissions_individual_clauses() {
        let perms = parse_permissions(
            "PERMISSIONS FOR select WHERE published = true FOR create NONE FOR update, delete WHERE owner = $auth.id",
        );
        assert_eq!(perms.select.as_deref(), Some("WHERE published = true"));
        assert_eq!(perms.create.as_deref(), Some("NONE"));
        assert_eq!(perms.update.as_deref(), Some("WHERE owner = $auth.id"));
        assert_eq!(perms.delete.as_deref(), Some("WHERE owner = $auth.id"));
    }

    #[test]
    fn permissions_grouped_database_form() {
        let perms = parse_permissions("PERMISSIONS FOR select FULL, FOR create, update, delete NONE");
        assert_eq!(perms.select.as_deref(), Some("FULL"));
        assert_eq!(perms.create.as_deref(), Some("NONE"));
        assert_eq!(perms.delete.as_deref(), Some("NONE"));
    }

    #[test]
    fn missing_permissions_clause_is_empty() {
        assert!(parse_permissions("DEFINE TABLE t SCHEMAFULL").is_empty());
    }
}
