use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, number, quoted string or any other bare word.
    Word,
    /// `=`, `<`, `>`, `<=`, `>=`, `!=` or `?=`.
    Operator,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: usize,
}

/// Character scanner over script text. Whitespace and `#` comments are skipped.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    /// Scan `text`, numbering lines from `first_line`.
    pub fn new(text: &'a str, first_line: usize) -> Self {
        Self { text, pos: 0, line: first_line }
    }

    #[inline] fn peek(&self) -> Option<char> { self.text[self.pos..].chars().next() }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' { self.line += 1 }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') { self.bump(); }
            } else if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize, line: usize) -> Token<'a> {
        Token { kind, text: &self.text[start..self.pos], line }
    }

    /// Next token, `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        self.skip_trivia();
        let (start, line) = (self.pos, self.line);
        let Some(c) = self.bump() else { return Ok(None) };

        let kind = match c {
            '{' => TokenKind::Open,
            '}' => TokenKind::Close,
            '=' => TokenKind::Operator,
            '<' | '>' | '!' | '?' => {
                if self.peek() == Some('=') {
                    self.bump();
                } else if matches!(c, '!' | '?') {
                    return Err(Error::parse(line, format!("expected '=' after '{c}'")));
                }
                TokenKind::Operator
            }
            '"' => {
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some(_) => {}
                        None => return Err(Error::parse(line, "unterminated string")),
                    }
                }
                TokenKind::Word
            }
            _ => {
                while self.peek().is_some_and(|c| !c.is_whitespace() && !"{}=<>!?#\"".contains(c)) {
                    self.bump();
                }
                TokenKind::Word
            }
        };

        Ok(Some(self.token(kind, start, line)))
    }

    /// Collect every remaining token.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
