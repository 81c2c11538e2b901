//! Turns the text of a migration file into individual statements.
//!
//! Quoting is tracked for double quotes only. Single-quoted strings,
//! escaped quotes and dollar-quoting are not recognised, and comment
//! markers inside any kind of string literal are stripped like real
//! comments. Migration files must avoid `;`, `--` and `/*` inside
//! single-quoted literals.

use std::sync::LazyLock;

use regex::Regex;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("line comment pattern is valid"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

/// Remove `--` line comments, then `/* */` block comments (shortest match).
pub fn strip_comments(sql: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(sql, "");
    BLOCK_COMMENT.replace_all(&without_lines, "").into_owned()
}

/// Split `sql` into trimmed, non-empty statements in file order.
///
/// A `;` is a split point only when an even number of `"` characters
/// precede it.
pub fn split_statements(sql: &str) -> Vec<String> {
    let cleaned = strip_comments(sql);

    let mut statements = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in cleaned.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                push_trimmed(&mut statements, &cleaned[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    push_trimmed(&mut statements, &cleaned[start..]);

    statements
}

fn push_trimmed(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
