//! Bracket-aware scanning of Rust source text.
//!
//! [`CodeChars`] walks a source string and yields the characters that are
//! part of code. A string, raw string or char literal is yielded as a single
//! quote character at its start offset, and comments are skipped, so
//! delimiters inside them never count as structure. Byte offsets are always
//! relative to the full text.

/// Iterator over `(offset, char)` pairs of code characters.
pub(crate) struct CodeChars<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> CodeChars<'a> {
    pub(crate) const fn new(text: &'a str, from: usize) -> Self {
        Self { text, pos: from }
    }

    /// Offset just past the last yielded item.
    pub(crate) const fn position(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn previous_is_ident(&self, at: usize) -> bool {
        self.text[..at]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    /// Skips a `"..."` literal starting at `self.pos`.
    fn skip_string(&mut self) {
        let mut escaped = false;
        for (i, c) in self.rest().char_indices().skip(1) {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += i + 1;
                return;
            }
        }
        self.pos = self.text.len();
    }

    /// Skips `r"..."` / `r#"..."#` if one starts at `self.pos`.
    fn skip_raw_string(&mut self) -> bool {
        let rest = self.rest();
        let hashes = rest[1..].chars().take_while(|&c| c == '#').count();
        if !rest[1 + hashes..].starts_with('"') {
            return false;
        }
        let body = 1 + hashes + 1;
        let closing = format!("\"{}", "#".repeat(hashes));
        self.pos += rest[body..]
            .find(&closing)
            .map_or(rest.len(), |end| body + end + closing.len());
        true
    }

    /// Skips a char literal starting at `self.pos`; lifetimes are left alone.
    fn skip_char(&mut self) -> bool {
        let rest = self.rest();
        match rest.chars().nth(1) {
            // The shortest escape is two characters, so the closing quote
            // is at offset 3 or later.
            Some('\\') => match rest.get(3..).and_then(|r| r.find('\'')) {
                Some(end) => {
                    self.pos += 3 + end + 1;
                    true
                }
                None => false,
            },
            Some(c) => {
                let after = 1 + c.len_utf8();
                if rest[after..].starts_with('\'') {
                    self.pos += after + 1;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    fn skip_line_comment(&mut self) {
        self.pos = self.rest().find('\n').map_or(self.text.len(), |n| self.pos + n);
    }

    fn skip_block_comment(&mut self) {
        let mut depth = 0usize;
        let mut i = self.pos;
        let bytes = self.text.as_bytes();
        while i + 1 < bytes.len() {
            if bytes[i] == b'/' && bytes[i + 1] == b'*' {
                depth += 1;
                i += 2;
            } else if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    self.pos = i;
                    return;
                }
            } else {
                i += 1;
            }
        }
        self.pos = self.text.len();
    }
}

impl Iterator for CodeChars<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.rest();
            let c = rest.chars().next()?;
            let at = self.pos;
            match c {
                '"' => {
                    self.skip_string();
                    return Some((at, '"'));
                }
                '/' if rest.starts_with("//") => self.skip_line_comment(),
                '/' if rest.starts_with("/*") => self.skip_block_comment(),
                'r' if !self.previous_is_ident(at) && self.skip_raw_string() => {
                    return Some((at, '"'));
                }
                'b' if !self.previous_is_ident(at) && rest[1..].starts_with('r') => {
                    self.pos += 1;
                    if self.skip_raw_string() {
                        return Some((at, '"'));
                    }
                    return Some((at, c));
                }
                '\'' if self.skip_char() => return Some((at, '\'')),
                _ => {
                    self.pos += c.len_utf8();
                    return Some((at, c));
                }
            }
        }
    }
}

const fn opens(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

const fn closes(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

/// Returns `true` if `offset` is a code position, not inside a literal or
/// comment.
pub(crate) fn is_code(text: &str, offset: usize) -> bool {
    CodeChars::new(text, 0)
        .take_while(|(i, _)| *i <= offset)
        .any(|(i, _)| i == offset)
}

/// Offset of the bracket matching the opener at `open`.
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in CodeChars::new(text, open) {
        if opens(c) {
            depth += 1;
        } else if closes(c) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Where a declaration ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    /// A depth-zero `,` or `;` at this offset; it belongs to the declaration.
    Separator(usize),
    /// The enclosing block closes at this offset; it does not belong to the
    /// declaration.
    BlockClose(usize),
    /// A `}` that closes the declaration's own body, e.g. an item `fn`.
    Body(usize),
}

impl End {
    /// First offset after the declaration. A separator is included; the
    /// whitespace before a block close is not.
    pub(crate) fn after(self, text: &str) -> usize {
        match self {
            Self::Separator(i) | Self::Body(i) => i + 1,
            Self::BlockClose(i) => text[..i].trim_end().len(),
        }
    }
}

/// Scans forward from `start` to the end of the declaration beginning there.
pub(crate) fn declaration_end(text: &str, start: usize) -> Option<End> {
    let mut depth = 0i32;
    for (i, c) in CodeChars::new(text, start) {
        match c {
            ',' | ';' if depth == 0 => return Some(End::Separator(i)),
            c if opens(c) => depth += 1,
            c if closes(c) => {
                depth -= 1;
                if depth < 0 {
                    return Some(End::BlockClose(i));
                }
                if depth == 0 && c == '}' {
                    return Some(End::Body(i));
                }
            }
            _ => {}
        }
    }
    None
}

/// One depth-zero element of a bracketed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    /// Offset of the first code character.
    pub start: usize,
    /// Offset just past the last code character, separator excluded.
    pub end: usize,
    /// Offset of the `,` that follows the entry, if any.
    pub comma: Option<usize>,
}

/// Lists the elements between the bracket at `open` and its match at
/// `close`.
pub(crate) fn entries(text: &str, open: usize, close: usize) -> Vec<Entry> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut current: Option<(usize, usize)> = None;
    let mut chars = CodeChars::new(text, open + 1);
    while let Some((i, c)) = chars.next() {
        if i >= close {
            break;
        }
        if c == ',' && depth == 0 {
            if let Some((start, end)) = current.take() {
                result.push(Entry {
                    start,
                    end,
                    comma: Some(i),
                });
            }
            continue;
        }
        if opens(c) {
            depth += 1;
        } else if closes(c) {
            depth -= 1;
        }
        if !c.is_whitespace() {
            let end = chars.position();
            current = Some(current.map_or((i, end), |(start, _)| (start, end)));
        }
    }
    if let Some((start, end)) = current {
        result.push(Entry {
            start,
            end,
            comma: None,
        });
    }
    result
}

/// Offset of the start of the line containing `offset`.
pub(crate) fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |n| n + 1)
}

/// Offset just past the newline ending the line containing `offset`.
pub(crate) fn line_end(text: &str, offset: usize) -> usize {
    text[offset..]
        .find('\n')
        .map_or(text.len(), |n| offset + n + 1)
}

/// Leading whitespace of the line containing `offset`.
pub(crate) fn indentation(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..];
    &line[..line.len() - line.trim_start_matches([' ', '\t']).len()]
}

/// Returns `true` if only whitespace precedes `offset` on its line.
pub(crate) fn starts_line(text: &str, offset: usize) -> bool {
    text[line_start(text, offset)..offset].trim().is_empty()
}

/// Returns `true` if only whitespace follows `offset` up to the newline.
pub(crate) fn ends_line(text: &str, offset: usize) -> bool {
    text[offset..line_end(text, offset)].trim().is_empty()
}
