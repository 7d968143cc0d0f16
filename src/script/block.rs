use std::{collections::HashSet, ops::Range};

use tracing::warn;

use super::{block_header, brace_delta, indentation};

/// A top-level `name = { ... }` span, with raw lines (terminators included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    pub name: &'a str,
    pub header: &'a str,
    pub body: Vec<&'a str>,
    /// The line that brought the depth back to zero; `None` if EOF came first.
    pub close: Option<&'a str>,
    /// 1-based line of the header.
    pub start_line: usize,
    /// 1-based line of the close (or the last line of the file).
    pub end_line: usize,
    /// Byte range of the body lines within the source text.
    pub body_span: Range<usize>,
    /// Byte range of the whole block within the source text.
    pub span: Range<usize>,
}

impl<'a> Block<'a> {
    #[inline] pub fn terminated(&self) -> bool { self.close.is_some() }

    /// Leading whitespace of the header line.
    #[inline] pub fn indent(&self) -> &'a str { indentation(self.header) }

    /// Every raw line of the block, header and close included.
    pub fn lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        std::iter::once(self.header)
            .chain(self.body.iter().copied())
            .chain(self.close)
    }
}

/// One item produced by the `BlockReader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A line outside any block, passed through as-is.
    Line { number: usize, text: &'a str },
    Block(Block<'a>),
}

impl<'a> Segment<'a> {
    /// Raw text of the segment; concatenating all segments yields the source.
    pub fn raw(&self, source: &'a str) -> &'a str {
        match self {
            Segment::Line { text, .. } => text,
            Segment::Block(block) => &source[block.span.clone()],
        }
    }
}

/// Lazily splits script text into pass-through lines and top-level blocks.
///
/// Brace depth is tracked per line. Headers whose name is in the exclusion set
/// are passed through without opening a block, so the blocks they wrap are read
/// as top-level blocks.
#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    excluded: HashSet<String>,
}

impl<'a> BlockReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 0, excluded: HashSet::new() }
    }

    /// Treat headers with these names as pass-through lines.
    pub fn exclude<I, S>(mut self, keywords: I) -> Self
    where I: IntoIterator<Item = S>, S: Into<String> {
        self.excluded.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Next raw line and its starting byte offset.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        if self.pos >= self.text.len() { return None }
        let start = self.pos;
        let end = self.text[start..].find('\n').map_or(self.text.len(), |i| start + i + 1);
        self.pos = end;
        self.line += 1;
        Some((start, &self.text[start..end]))
    }
}

impl<'a> Iterator for BlockReader<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let (start, header) = self.next_line()?;
        let start_line = self.line;

        let name = match block_header(header) {
            Some(name) if !self.excluded.contains(name) => name,
            _ => return Some(Segment::Line { number: start_line, text: header }),
        };

        let body_start = self.pos;
        let mut body_end = self.pos;
        let mut body = Vec::new();
        let mut close = None;
        let mut depth = brace_delta(header);
        while depth > 0 {
            let Some((line_start, line)) = self.next_line() else { break };
            depth += brace_delta(line);
            if depth > 0 {
                body.push(line);
                body_end = self.pos;
            } else {
                body_end = line_start;
                close = Some(line);
            }
        }

        if close.is_none() {
            warn!(block = name, line = start_line, "unterminated block runs to end of file");
        }

        Some(Segment::Block(Block {
            name,
            header,
            body,
            close,
            start_line,
            end_line: self.line,
            body_span: body_start..body_end,
            span: start..self.pos,
        }))
    }
}
