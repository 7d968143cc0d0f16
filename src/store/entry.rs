use std::{ops::Range, sync::{Arc, LazyLock}};

use regex::Regex;
use serde::Serialize;

use crate::{config::Conventions, script::strip_comment};

/// One weighted, tagged record of a location (a population segment).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubEntry {
    pub category: String,
    /// Never negative.
    pub weight: f64,
    pub tag_a: String,
    pub tag_b: String,
    /// Any further `key = value` fields, carried through unchanged.
    pub extra: Vec<(String, String)>,
}

impl SubEntry {
    pub fn new(category: impl Into<String>, weight: f64, tag_a: impl Into<String>, tag_b: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            weight,
            tag_a: tag_a.into(),
            tag_b: tag_b.into(),
            extra: Vec::new(),
        }
    }
}

/// All sub-entries of one location, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafRecord {
    pub leaf_id: Arc<str>,
    pub subentries: Vec<SubEntry>,
}

impl LeafRecord {
    pub fn new(leaf_id: impl Into<Arc<str>>, subentries: Vec<SubEntry>) -> Self {
        Self { leaf_id: leaf_id.into(), subentries }
    }

    /// Sum of sub-entry weights (zero for an empty record).
    #[inline] pub fn total(&self) -> f64 { self.subentries.iter().map(|e| e.weight).sum() }

    /// Copy of this record with every weight multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let subentries = self.subentries.iter()
            .map(|e| SubEntry { weight: e.weight * factor, ..e.clone() })
            .collect();
        Self { leaf_id: Arc::clone(&self.leaf_id), subentries }
    }
}

/// A parsed sub-entry line and where its weight text sits in that line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntryLine {
    pub entry: SubEntry,
    pub weight_span: Range<usize>,
}

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<key>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?P<value>"[^"]*"|[^\s{}=]+)"#)
        .expect("field pattern is valid")
});

/// Matches one-line sub-entries: `define_pop = { type = x size = 1.0 ... }`.
#[derive(Debug, Clone)]
pub(crate) struct EntryPattern<'c> {
    conventions: &'c Conventions,
    line: Regex,
}

impl<'c> EntryPattern<'c> {
    pub(crate) fn new(conventions: &'c Conventions) -> Self {
        let pattern = format!(r"^\s*{}\s*=\s*\{{(?P<body>[^{{}}]*)\}}", regex::escape(&conventions.entry_keyword));
        let line = Regex::new(&pattern).expect("escaped keyword forms a valid pattern");
        Self { conventions, line }
    }

    /// `None` for lines that are not sub-entries, `Some(Err(reason))` for
    /// sub-entry lines that cannot be used.
    pub(crate) fn parse(&self, line: &str) -> Option<Result<EntryLine, String>> {
        let code = strip_comment(line);
        let body = self.line.captures(code)?.name("body")?;
        let conv = self.conventions;

        let mut category = None;
        let mut weight = None;
        let mut tags = [String::new(), String::new()];
        let mut extra = Vec::new();

        for field in FIELD.captures_iter(body.as_str()) {
            let (Some(key), Some(value)) = (field.name("key"), field.name("value")) else { continue };
            let (key, text) = (key.as_str(), value.as_str());
            if key == conv.category_field {
                category = Some(text.to_string());
            } else if key == conv.weight_field {
                let span = body.start() + value.start()..body.start() + value.end();
                weight = Some((text, span));
            } else if key == conv.tag_fields[0] {
                tags[0] = text.to_string();
            } else if key == conv.tag_fields[1] {
                tags[1] = text.to_string();
            } else {
                extra.push((key.to_string(), text.to_string()));
            }
        }

        let Some(category) = category else {
            return Some(Err(format!("missing '{}'", conv.category_field)));
        };
        let Some((text, weight_span)) = weight else {
            return Some(Err(format!("missing '{}'", conv.weight_field)));
        };
        let weight = match text.parse::<f64>() {
            Ok(w) if w.is_finite() && w >= 0.0 => w,
            _ => return Some(Err(format!("'{}' is not a non-negative number", text))),
        };

        let [tag_a, tag_b] = tags;
        Some(Ok(EntryLine {
            entry: SubEntry { category, weight, tag_a, tag_b, extra },
            weight_span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tab_separated_entry() {
        let conv = Conventions::default();
        let pattern = EntryPattern::new(&conv);
        let line = "\t\tdefine_pop = {\ttype = nobles\tsize = 1.250\tculture = french\treligion = catholic }\n";
        let parsed = pattern.parse(line).unwrap().unwrap();

        assert_eq!(parsed.entry, SubEntry::new("nobles", 1.25, "french", "catholic"));
        assert_eq!(&line[parsed.weight_span], "1.250");
    }

    #[test]
    fn keeps_unknown_fields_in_order() {
        let conv = Conventions::default();
        let pattern = EntryPattern::new(&conv);
        let line = "define_pop = { religion = sunni size = 3 type = burghers culture = turkish literacy = 0.2 } # note";
        let entry = pattern.parse(line).unwrap().unwrap().entry;

        assert_eq!(entry.category, "burghers");
        assert_eq!(entry.weight, 3.0);
        assert_eq!(entry.tag_a, "turkish");
        assert_eq!(entry.tag_b, "sunni");
        assert_eq!(entry.extra, vec![("literacy".to_string(), "0.2".to_string())]);
    }

    #[test]
    fn rejects_unusable_entries_and_ignores_other_lines() {
        let conv = Conventions::default();
        let pattern = EntryPattern::new(&conv);
        assert!(pattern.parse("\tparis = {").is_none());
        assert!(pattern.parse("# define_pop = { type = a size = 1 }").is_none());
        assert!(pattern.parse("define_pop = {").is_none());
        assert!(pattern.parse("define_pop = { type = a size = -1 }").unwrap().is_err());
        assert!(pattern.parse("define_pop = { type = a size = lots }").unwrap().is_err());
        assert!(pattern.parse("define_pop = { size = 4 }").unwrap().is_err());
    }

    #[test]
    fn scaling_preserves_ratios() {
        let record = LeafRecord::new("paris", vec![
            SubEntry::new("nobles", 10.0, "french", "catholic"),
            SubEntry::new("peasants", 30.0, "french", "catholic"),
        ]);
        let scaled = record.scaled(0.5);
        assert_eq!(scaled.total(), 20.0);
        assert_eq!(scaled.subentries[1].weight / scaled.subentries[0].weight, 3.0);
        assert_eq!(record.total(), 40.0);
    }
}
