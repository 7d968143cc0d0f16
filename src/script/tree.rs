use std::iter::Peekable;

use crate::error::{Error, Result};
use super::lexer::{Lexer, Token, TokenKind};

/// Value on the right of an operator, or a bare item inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<'a> {
    Scalar(&'a str),
    /// `{ ... }`, optionally preceded by a tag word (`rgb { 1 2 3 }`).
    Block { tag: Option<&'a str>, entries: Vec<Entry<'a>> },
}

/// `key op value`, or a bare value when `key` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: Option<&'a str>,
    pub operator: Option<&'a str>,
    pub value: Value<'a>,
    pub line: usize,
}

impl<'a> Entry<'a> {
    /// Nested entries if this entry holds a block.
    pub fn entries(&self) -> Option<&[Entry<'a>]> {
        match &self.value {
            Value::Block { entries, .. } => Some(entries.as_slice()),
            Value::Scalar(_) => None,
        }
    }

    /// Bare word if this entry has no key and a scalar value.
    pub fn bare_word(&self) -> Option<&'a str> {
        match (self.key, &self.value) {
            (None, Value::Scalar(word)) => Some(*word),
            _ => None,
        }
    }
}

/// Parse script text into entries, numbering lines from `first_line`.
pub fn parse_entries(text: &str, first_line: usize) -> Result<Vec<Entry<'_>>> {
    let tokens = Lexer::new(text, first_line).tokenize()?;
    let mut parser = Parser { tokens: tokens.into_iter().peekable(), last_line: first_line };
    parser.entries(None)
}

struct Parser<'a> {
    tokens: Peekable<std::vec::IntoIter<Token<'a>>>,
    last_line: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.next()?;
        self.last_line = token.line;
        Some(token)
    }

    fn peek_kind(&mut self) -> Option<TokenKind> { self.tokens.peek().map(|t| t.kind) }

    /// Entries until the matching close (`opened_at` is the line of the open
    /// brace) or until end of input at the top level.
    fn entries(&mut self, opened_at: Option<usize>) -> Result<Vec<Entry<'a>>> {
        let mut entries = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return match opened_at {
                    Some(line) => Err(Error::parse(line, "unterminated '{'")),
                    None => Ok(entries),
                };
            };

            let entry = match token.kind {
                TokenKind::Close => {
                    return match opened_at {
                        Some(_) => Ok(entries),
                        None => Err(Error::parse(token.line, "unexpected '}'")),
                    };
                }
                TokenKind::Open => Entry {
                    key: None,
                    operator: None,
                    value: Value::Block { tag: None, entries: self.entries(Some(token.line))? },
                    line: token.line,
                },
                TokenKind::Operator => {
                    return Err(Error::parse(token.line, format!("unexpected '{}'", token.text)));
                }
                TokenKind::Word if self.peek_kind() == Some(TokenKind::Operator) => {
                    let operator = self.next().map(|t| t.text);
                    Entry { key: Some(token.text), operator, value: self.value()?, line: token.line }
                }
                TokenKind::Word => Entry {
                    key: None,
                    operator: None,
                    value: Value::Scalar(token.text),
                    line: token.line,
                },
            };
            entries.push(entry);
        }
    }

    /// Right-hand side of `key op ...`.
    fn value(&mut self) -> Result<Value<'a>> {
        let line = self.last_line;
        match self.next() {
            Some(Token { kind: TokenKind::Open, line, .. }) => {
                Ok(Value::Block { tag: None, entries: self.entries(Some(line))? })
            }
            Some(Token { kind: TokenKind::Word, text, .. }) => {
                if self.peek_kind() == Some(TokenKind::Open) {
                    let open = self.next().map_or(line, |t| t.line);
                    Ok(Value::Block { tag: Some(text), entries: self.entries(Some(open))? })
                } else {
                    Ok(Value::Scalar(text))
                }
            }
            Some(token) => Err(Error::parse(token.line, format!("expected a value, found '{}'", token.text))),
            None => Err(Error::parse(line, "expected a value at end of input")),
        }
    }
}
