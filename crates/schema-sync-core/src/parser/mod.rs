//! DDL parser for SurrealQL `DEFINE` statements.
//!
//! Each function turns one raw statement into an AST fragment. Clause
//! bodies are read lazily up to the next clause keyword rather than through
//! a full grammar; see [`clauses`] for the rules.

mod clauses;
mod define;
pub mod error;

pub use define::{parse_event, parse_field, parse_index, parse_table, parse_target};
pub use error::{DefinitionKind, ParseError};

/// Parses a `PERMISSIONS` clause found anywhere in `statement`.
#[must_use]
pub fn parse_permissions(statement: &str) -> crate::ast::Permissions {
    clauses::parse_permissions(statement)
}

/// Splits a script into statements on `;` outside of strings and brackets.
///
/// `--`, `//` and `#` line comments are dropped. Returned statements are
/// trimmed and carry no trailing `;`.
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = script.chars().peekable();
    let mut quote: Option<char> = None;
    let mut depth: i32 = 0;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
            '#' => skip_line(&mut chars),
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ';' if depth <= 0 => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &current);
    statements
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_semicolons_in_strings_and_blocks() {
        let script = "-- users\nDEFINE TABLE user SCHEMAFULL;\n\
                      DEFINE FIELD bio ON user TYPE string DEFAULT 'a;b';\n\
                      DEFINE EVENT e ON user THEN { CREATE log; UPDATE x; };";
        let statements = split_statements(script);
        assert_eq!(
            statements,
            vec![
                "DEFINE TABLE user SCHEMAFULL",
                "DEFINE FIELD bio ON user TYPE string DEFAULT 'a;b'",
                "DEFINE EVENT e ON user THEN { CREATE log; UPDATE x; }",
            ]
        );
    }

    #[test]
    fn split_drops_empty_statements() {
        assert!(split_statements(" ;; \n// nothing\n").is_empty());
    }
}
