use tracing::{debug, warn};

use crate::{
    config::Conventions,
    error::{Error, Result},
    script::{BlockReader, Entry, Segment, parse_entries},
};
use super::{hierarchy::Hierarchy, node::{NodeId, NodeKind}};

impl Hierarchy {
    /// Build the hierarchy from definitions text.
    ///
    /// Blocks named with the region suffix become regions, blocks named with the
    /// area suffix become areas (under the enclosing region, if any), their
    /// province sub-blocks become provinces, and bare words inside a province are
    /// locations. Any other block is walked through transparently.
    ///
    /// Containers and regions are read line by line; only area bodies and
    /// one-line blocks are parsed as entries. Content that fails to parse is
    /// logged and skipped, so it only costs the block it sits in. A top-level
    /// block that is never closed is an error.
    pub fn parse(text: &str, conventions: &Conventions) -> Result<Self> {
        let mut builder = Builder { hierarchy: Hierarchy::default(), conventions };
        builder.lines(text, 1, None, true)?;

        let hierarchy = builder.hierarchy;
        debug!(
            regions = hierarchy.count(NodeKind::Region),
            areas = hierarchy.count(NodeKind::Area),
            provinces = hierarchy.count(NodeKind::Province),
            locations = hierarchy.count(NodeKind::Leaf),
            skipped = hierarchy.skipped(),
            "parsed definitions"
        );
        Ok(hierarchy)
    }
}

struct Builder<'c> {
    hierarchy: Hierarchy,
    conventions: &'c Conventions,
}

impl Builder<'_> {
    /// Walk `text`, whose first line is `first_line` in the file.
    fn lines(&mut self, text: &str, first_line: usize, region: Option<NodeId>, top: bool) -> Result<()> {
        for segment in BlockReader::new(text) {
            match segment {
                Segment::Line { number, text: line } => {
                    if line.contains('{') {
                        self.one_line(line, first_line + number - 1, region);
                    }
                }
                Segment::Block(block) => {
                    let line = first_line + block.start_line - 1;
                    if !block.terminated() {
                        if top {
                            return Err(Error::parse(line, format!("block '{}' is never closed", block.name)));
                        }
                        warn!(block = block.name, line, "unclosed block skipped");
                        self.hierarchy.note_skipped();
                        continue;
                    }

                    let body = &text[block.body_span.clone()];
                    if self.conventions.is_area(block.name) {
                        match parse_entries(body, line + 1) {
                            Ok(entries) => self.area(block.name, &entries, region, line),
                            Err(err) => {
                                warn!(area = block.name, line, %err, "area skipped");
                                self.hierarchy.note_skipped();
                            }
                        }
                    } else if self.conventions.is_region(block.name) {
                        let (id, _) = self.hierarchy.intern(NodeKind::Region, block.name, region, line);
                        self.lines(body, line + 1, Some(id), false)?;
                    } else {
                        self.lines(body, line + 1, region, false)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A line holding whole blocks (`x_area = { p_province = { a b } }`).
    fn one_line(&mut self, line: &str, number: usize, region: Option<NodeId>) {
        match parse_entries(line, number) {
            Ok(entries) => self.walk(&entries, region),
            Err(err) => {
                warn!(line = number, %err, "unparsable line skipped");
                self.hierarchy.note_skipped();
            }
        }
    }

    fn named_block(&mut self, name: &str, entries: &[Entry<'_>], region: Option<NodeId>, line: usize) {
        if self.conventions.is_area(name) {
            self.area(name, entries, region, line);
        } else if self.conventions.is_region(name) {
            let (id, _) = self.hierarchy.intern(NodeKind::Region, name, region, line);
            self.walk(entries, Some(id));
        } else {
            self.walk(entries, region);
        }
    }

    /// Visit every keyed block among `entries`.
    fn walk(&mut self, entries: &[Entry<'_>], region: Option<NodeId>) {
        for entry in entries {
            if let (Some(key), Some(children)) = (entry.key, entry.entries()) {
                self.named_block(key, children, region, entry.line);
            }
        }
    }

    fn area(&mut self, name: &str, entries: &[Entry<'_>], region: Option<NodeId>, line: usize) {
        let (area, _) = self.hierarchy.intern(NodeKind::Area, name, region, line);

        for entry in entries {
            let (Some(key), Some(children)) = (entry.key, entry.entries()) else { continue };
            if !self.conventions.is_province(key) {
                debug!(area = name, block = key, line = entry.line, "skipping non-province block");
                continue;
            }

            let (province, _) = self.hierarchy.intern(NodeKind::Province, key, Some(area), entry.line);
            for child in children {
                match child.bare_word() {
                    Some(location) => { self.hierarchy.intern(NodeKind::Leaf, location, Some(province), child.line); }
                    None => warn!(province = key, line = child.line, "unexpected entry in province"),
                }
            }
        }
    }
}
