//! Readers for the brace-delimited script format.
//!
//! `block` works line by line and keeps the raw text of every line so files can
//! be rewritten exactly; `lexer` and `tree` parse a block body into nested entries.

mod block;
mod lexer;
mod tree;

pub use block::{Block, BlockReader, Segment};
pub use lexer::{Lexer, Token, TokenKind};
pub use tree::{Entry, Value, parse_entries};

/// Strip a trailing `#` comment, ignoring `#` inside double quotes.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Net change in brace depth over one line, ignoring comments and quoted text.
pub(crate) fn brace_delta(line: &str) -> i64 {
    let mut in_quotes = false;
    let mut delta = 0;
    for c in strip_comment(line).chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => delta += 1,
            '}' if !in_quotes => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Leading whitespace of a line.
#[inline]
pub(crate) fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// The line terminator (`"\r\n"`, `"\n"` or `""` for a last line without one).
pub(crate) fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") { "\r\n" } else if line.ends_with('\n') { "\n" } else { "" }
}

/// Identifiers are non-empty runs of ASCII alphanumerics and underscores.
pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// If `line` opens a named block (`name = {`), return the name.
pub(crate) fn block_header(line: &str) -> Option<&str> {
    let code = strip_comment(line).trim();
    let (name, rest) = code.split_once('=')?;
    let name = name.trim();
    (rest.trim() == "{" && is_identifier(name)).then_some(name)
}
