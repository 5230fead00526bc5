//! Frontmatter parsing for markdown content files.
//!
//! ## Grammar
//!
//! ```text
//! ---                      <- first line (an optional UTF-8 BOM may precede it)
//! title: "Foo"             <- key: value, split at the first ':'
//! # a comment              <- ignored
//!                          <- blank lines ignored
//! date: 2024-01-01
//! ---                      <- closing line
//! body...
//! ```
//!
//! - Keys are trimmed, non-empty, and contain no whitespace.
//! - Values are trimmed; one pair of matching `"` or `'` quotes is stripped.
//! - A repeated key keeps its last value.
//! - Indented lines and `- item` lines (YAML lists and continuations) are not
//!   read; their line numbers are kept in [`Document::ignored_lines`].
//! - The body is everything after the closing line, minus leading blank lines.
//!
//! A file that does not start with `---` has no frontmatter; the whole file is
//! the body.

use std::collections::BTreeMap;
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrontmatterError {
    #[error("frontmatter opened on line 1 is never closed")]
    Unclosed,
    #[error("line {line}: expected `key: value`, got {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// A markdown file split into metadata and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub fields: BTreeMap<String, String>,
    pub body: String,
    /// 1-based line numbers of nested lines that were skipped.
    pub ignored_lines: Vec<usize>,
}

impl Document {
    /// Field value, `None` when absent or empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

pub fn parse(source: &str) -> Result<Document, FrontmatterError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');
    let mut offset = match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => first.len(),
        _ => {
            return Ok(Document {
                body: source.to_string(),
                ..Document::default()
            });
        }
    };

    let mut fields = BTreeMap::new();
    let mut ignored_lines = Vec::new();
    let mut closed = false;
    // Line 1 is the opening delimiter.
    for (idx, raw) in lines.enumerate() {
        offset += raw.len();
        let line = raw.trim_end();
        if line == DELIMITER {
            closed = true;
            break;
        }
        if is_nested(line) {
            ignored_lines.push(idx + 2);
            continue;
        }
        if let Some((key, value)) = parse_line(line, idx + 2)? {
            fields.insert(key, value);
        }
    }
    if !closed {
        return Err(FrontmatterError::Unclosed);
    }

    let body = strip_leading_blank_lines(&source[offset..]);

    Ok(Document {
        fields,
        body: body.to_string(),
        ignored_lines,
    })
}

/// A list item or an indented continuation of the previous key.
fn is_nested(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    line.starts_with([' ', '\t']) || trimmed == "-" || trimmed.starts_with("- ")
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<(String, String)>, FrontmatterError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let malformed = || FrontmatterError::MalformedLine {
        line: line_no,
        text: line.to_string(),
    };
    let (key, value) = trimmed.split_once(':').ok_or_else(malformed)?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(malformed());
    }
    Ok(Some((key.to_string(), unquote(value.trim()).to_string())))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn strip_leading_blank_lines(text: &str) -> &str {
    let mut rest = text;
    while let Some(nl) = rest.find('\n') {
        if rest[..nl].trim().is_empty() {
            rest = &rest[nl + 1..];
        } else {
            break;
        }
    }
    rest
}
