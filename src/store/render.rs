use std::{fmt::Write, sync::Arc};

use indexmap::IndexMap;

use crate::config::Conventions;
use super::entry::{LeafRecord, SubEntry};

/// Writes sub-entries and location blocks in the data file's canonical layout.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'c> {
    conventions: &'c Conventions,
    precision: usize,
}

impl<'c> Renderer<'c> {
    pub fn new(conventions: &'c Conventions, precision: usize) -> Self {
        Self { conventions, precision }
    }

    #[inline] pub fn precision(&self) -> usize { self.precision }

    /// Weight with the configured number of decimals.
    #[inline] pub fn weight(&self, weight: f64) -> String { format!("{:.*}", self.precision, weight) }

    /// `define_pop = {\ttype = x\tsize = 1.000\tculture = y\treligion = z }`
    pub fn entry_line(&self, entry: &SubEntry, indent: &str, eol: &str) -> String {
        let conv = self.conventions;
        let mut line = format!(
            "{indent}{} = {{\t{} = {}\t{} = {}",
            conv.entry_keyword, conv.category_field, entry.category, conv.weight_field, self.weight(entry.weight),
        );
        for (field, value) in conv.tag_fields.iter().zip([&entry.tag_a, &entry.tag_b]) {
            if !value.is_empty() { let _ = write!(line, "\t{field} = {value}"); }
        }
        for (field, value) in &entry.extra {
            let _ = write!(line, "\t{field} = {value}");
        }
        line.push_str(" }");
        line.push_str(eol);
        line
    }

    /// A whole location block at `indent`, sub-entries one level deeper.
    pub fn block(&self, record: &LeafRecord, indent: &str, eol: &str) -> String {
        let inner = format!("{indent}\t");
        let mut out = format!("{indent}{} = {{{eol}", record.leaf_id);
        for entry in &record.subentries {
            out.push_str(&self.entry_line(entry, &inner, eol));
        }
        out.push_str(indent);
        out.push('}');
        out.push_str(eol);
        out
    }

    /// Standalone data file holding `records` sorted by location id, with an
    /// optional leading comment.
    pub fn document(&self, records: &IndexMap<Arc<str>, LeafRecord>, comment: Option<&str>) -> String {
        let mut out = format!("{} = {{\n", self.conventions.wrapper);
        if let Some(comment) = comment {
            let _ = write!(out, "\t# {comment}\n\n");
        }

        let mut sorted: Vec<_> = records.values().collect();
        sorted.sort_by(|a, b| a.leaf_id.cmp(&b.leaf_id));
        for record in sorted {
            out.push_str(&self.block(record, "\t", "\n"));
        }
        out.push_str("}\n");
        out
    }
}
