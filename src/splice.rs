//! Rewrites selected location blocks of a data file, leaving every other byte as it was.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::Conventions,
    error::{Error, Result},
    script::{Block, BlockReader, Segment, line_ending},
    store::{EntryPattern, LeafRecord, Renderer, SubEntry},
};

/// New file contents, the untouched original, and which blocks were rewritten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Splice {
    #[serde(skip)]
    pub text: String,
    /// The original text, to be written as the backup before `text` replaces it.
    #[serde(skip)]
    pub backup: String,
    pub replaced: Vec<Arc<str>>,
    /// Requested locations that have no block in the file.
    pub missing_targets: Vec<Arc<str>>,
}

impl Splice {
    /// Whether the new text is byte-identical to the original.
    #[inline] pub fn is_identity(&self) -> bool { self.text == self.backup }
}

/// Replace the block of every location in `records` with freshly rendered
/// sub-entries, in a single pass over `original`.
///
/// When the original block's sub-entry lines correspond one-to-one to the new
/// sub-entries, only the weight values are rewritten (and left alone when they
/// are equal at the output precision); otherwise the block is rendered anew.
/// `annotation` becomes a comment line before the first replaced block. Only
/// the first block of a repeated location is replaced.
pub fn splice(
    original: &str,
    records: &IndexMap<Arc<str>, LeafRecord>,
    annotation: Option<&str>,
    conventions: &Conventions,
    precision: usize,
) -> Result<Splice> {
    let pattern = EntryPattern::new(conventions);
    let renderer = Renderer::new(conventions, precision);

    let mut text = String::with_capacity(original.len() + annotation.map_or(0, |a| a.len() + 8));
    let mut replaced: IndexSet<Arc<str>> = IndexSet::new();
    let mut annotation = annotation;

    for segment in BlockReader::new(original).exclude(conventions.container_keywords()) {
        let block = match segment {
            Segment::Line { text: line, .. } => { text.push_str(line); continue }
            Segment::Block(block) => block,
        };
        if !block.terminated() {
            return Err(Error::parse(block.start_line, format!("location '{}' is never closed", block.name)));
        }

        let record = match records.get_key_value(block.name) {
            Some((id, record)) if !replaced.contains(block.name) => { replaced.insert(Arc::clone(id)); record }
            _ => { text.push_str(&original[block.span.clone()]); continue }
        };

        if let Some(comment) = annotation.take() {
            let eol = match line_ending(block.header) { "" => "\n", eol => eol };
            text.push_str(block.indent());
            text.push_str("# ");
            text.push_str(comment);
            text.push_str(eol);
        }

        debug!(location = block.name, line = block.start_line, "replacing block");
        text.push_str(&render_block(&block, record, &pattern, &renderer));
    }

    let missing_targets: Vec<Arc<str>> = records.keys()
        .filter(|id| !replaced.contains(*id))
        .cloned()
        .collect();
    for id in &missing_targets {
        warn!(location = &**id, "no block found for location, left unchanged");
    }

    Ok(Splice {
        text,
        backup: original.to_string(),
        replaced: replaced.into_iter().collect(),
        missing_targets,
    })
}

/// Everything but the weight must match for a line to be rewritten in place.
fn same_except_weight(a: &SubEntry, b: &SubEntry) -> bool {
    a.category == b.category && a.tag_a == b.tag_a && a.tag_b == b.tag_b && a.extra == b.extra
}

fn render_block(block: &Block<'_>, record: &LeafRecord, pattern: &EntryPattern<'_>, renderer: &Renderer<'_>) -> String {
    let parsed: Vec<_> = block.body.iter().enumerate()
        .filter_map(|(i, line)| match pattern.parse(line) {
            Some(Ok(parsed)) => Some((i, parsed)),
            _ => None,
        })
        .collect();

    let aligned = parsed.len() == record.subentries.len()
        && parsed.iter().zip(&record.subentries).all(|((_, p), e)| same_except_weight(&p.entry, e));

    if !aligned {
        let eol = match line_ending(block.header) { "" => "\n", eol => eol };
        let mut out = renderer.block(record, block.indent(), eol);
        if block.close.is_some_and(|close| line_ending(close).is_empty()) {
            out.truncate(out.len() - eol.len());
        }
        return out;
    }

    let mut out = String::from(block.header);
    let mut updates = parsed.iter().zip(&record.subentries).peekable();
    for (i, line) in block.body.iter().enumerate() {
        match updates.next_if(|((j, _), _)| *j == i) {
            Some(((_, p), entry)) => {
                let span = p.weight_span.clone();
                let text = renderer.weight(entry.weight);
                if entry.weight == p.entry.weight || renderer.weight(p.entry.weight) == text {
                    out.push_str(line);
                } else {
                    out.push_str(&line[..span.start]);
                    out.push_str(&text);
                    out.push_str(&line[span.end..]);
                }
            }
            None => out.push_str(line),
        }
    }
    out.push_str(block.close.unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPS: &str = "\
# 1644 setup
locations = {
\tparis = {
\t\tdefine_pop = {\ttype = nobles\tsize = 1.000\tculture = french\treligion = catholic }
\t\t# the rest
\t\tdefine_pop = {\ttype = peasants\tsize = 3.000\tculture = french\treligion = catholic }
\t}

\tlyon = {
\t\tdefine_pop = {\ttype = peasants\tsize = 2\tculture = arpitan\treligion = catholic }
\t}
\tdijon = { # burgundy
\t\tdefine_pop = {\ttype = burghers\tsize = 0.5\tculture = burgundian\treligion = catholic }
\t}
}
";

    fn records(store: &crate::store::LeafStore, factor: f64, ids: &[&str]) -> IndexMap<Arc<str>, LeafRecord> {
        ids.iter()
            .filter_map(|&id| store.get(id))
            .map(|r| (Arc::clone(&r.leaf_id), r.scaled(factor)))
            .collect()
    }

    fn store() -> crate::store::LeafStore {
        crate::store::LeafStore::parse(POPS, &Conventions::default()).unwrap()
    }

    #[test]
    fn rewrites_only_weights_of_target_blocks() {
        let conv = Conventions::default();
        let out = splice(POPS, &records(&store(), 0.5, &["paris", "dijon"]), None, &conv, 3).unwrap();

        let expected = POPS
            .replace("size = 1.000", "size = 0.500")
            .replace("size = 3.000", "size = 1.500")
            .replace("size = 0.5\t", "size = 0.250\t");
        assert_eq!(out.text, expected);
        assert_eq!(out.backup, POPS);
        assert_eq!(out.replaced, vec![Arc::<str>::from("paris"), Arc::<str>::from("dijon")]);
        assert!(out.missing_targets.is_empty());
    }

    #[test]
    fn identity_factor_is_byte_identical() {
        let conv = Conventions::default();
        let out = splice(POPS, &records(&store(), 1.0, &["paris", "lyon", "dijon"]), None, &conv, 3).unwrap();
        assert!(out.is_identity());
    }

    #[test]
    fn annotation_precedes_first_replaced_block_once() {
        let conv = Conventions::default();
        let out = splice(POPS, &records(&store(), 1.0, &["lyon", "dijon"]), Some("scaled"), &conv, 3).unwrap();
        let expected = POPS.replace("\tlyon = {\n", "\t# scaled\n\tlyon = {\n");
        assert_eq!(out.text, expected);
    }

    #[test]
    fn changed_entries_render_a_fresh_block() {
        let conv = Conventions::default();
        let mut new = IndexMap::new();
        new.insert(Arc::from("lyon"), LeafRecord::new("lyon", vec![
            SubEntry::new("peasants", 4.0, "arpitan", "catholic"),
            SubEntry::new("clergy", 0.25, "arpitan", "catholic"),
        ]));
        let out = splice(POPS, &new, None, &conv, 2).unwrap();

        let old_block = "\tlyon = {\n\t\tdefine_pop = {\ttype = peasants\tsize = 2\tculture = arpitan\treligion = catholic }\n\t}\n";
        let new_block = "\tlyon = {\n\
            \t\tdefine_pop = {\ttype = peasants\tsize = 4.00\tculture = arpitan\treligion = catholic }\n\
            \t\tdefine_pop = {\ttype = clergy\tsize = 0.25\tculture = arpitan\treligion = catholic }\n\
            \t}\n";
        assert_eq!(out.text, POPS.replace(old_block, new_block));
    }

    #[test]
    fn unknown_targets_are_reported() {
        let conv = Conventions::default();
        let mut new = records(&store(), 2.0, &["lyon"]);
        new.insert(Arc::from("atlantis"), LeafRecord::new("atlantis", vec![]));
        let out = splice(POPS, &new, None, &conv, 3).unwrap();

        assert_eq!(out.replaced, vec![Arc::<str>::from("lyon")]);
        assert_eq!(out.missing_targets, vec![Arc::<str>::from("atlantis")]);
        assert!(out.text.contains("size = 4.000\tculture = arpitan"));
    }

    #[test]
    fn preserves_crlf_and_missing_final_newline() {
        let conv = Conventions::default();
        let text = "locations = {\r\n\ta = {\r\n\t\tdefine_pop = { type = x size = 2 culture = c religion = r }\r\n\t}\r\n}";
        let store = crate::store::LeafStore::parse(text, &conv).unwrap();
        let out = splice(text, &records(&store, 1.5, &["a"]), Some("note"), &conv, 1).unwrap();
        assert_eq!(
            out.text,
            "locations = {\r\n\t# note\r\n\ta = {\r\n\t\tdefine_pop = { type = x size = 3.0 culture = c religion = r }\r\n\t}\r\n}",
        );
    }
}
