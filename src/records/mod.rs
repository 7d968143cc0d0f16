//! Normalized tabular records and their conversion into location records.

mod csv;

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::Conventions,
    store::{LeafRecord, SubEntry},
};

pub use csv::CsvSource;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Most specific scalar for a cell's text; `None` for blank cells. Digits
    /// with leading zeros stay text.
    pub fn infer(text: &str) -> Option<Self> {
        let text = text.trim();
        let padded = text.len() > 1 && text.starts_with('0') && !text.starts_with("0.");
        if text.is_empty() {
            None
        } else if padded {
            Some(Scalar::Str(text.to_string()))
        } else if let Ok(int) = text.parse::<i64>() {
            Some(Scalar::Int(int))
        } else if let Ok(float) = text.parse::<f64>() {
            Some(Scalar::Float(float))
        } else {
            Some(Scalar::Str(text.to_string()))
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
        }
    }
}

/// One row: field name → value, in column order.
pub type Record = IndexMap<String, Option<Scalar>>;

/// Anything that yields normalized records in a stable order.
pub trait RecordSource {
    fn records(&self) -> anyhow::Result<Vec<Record>>;
}

/// Records already in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource(pub Vec<Record>);

impl RecordSource for VecSource {
    fn records(&self) -> anyhow::Result<Vec<Record>> { Ok(self.0.clone()) }
}

/// Names of the fields a record is read through.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    pub location: String,
    pub category: String,
    pub weight: String,
    pub tag_a: String,
    pub tag_b: String,
}

impl RecordFields {
    /// Field names matching the data file's sub-entry keys.
    pub fn from_conventions(conventions: &Conventions) -> Self {
        let [tag_a, tag_b] = conventions.tag_fields.clone();
        Self {
            location: "location".into(),
            category: conventions.category_field.clone(),
            weight: conventions.weight_field.clone(),
            tag_a,
            tag_b,
        }
    }
}

impl Default for RecordFields {
    fn default() -> Self { Self::from_conventions(&Conventions::default()) }
}

fn text(record: &Record, field: &str) -> Option<String> {
    record.get(field).and_then(Option::as_ref).map(Scalar::to_string)
}

/// Group rows into location records, locations in first-seen order.
///
/// Each row is one sub-entry. Rows without a location or a category, or whose
/// weight is missing, negative or not a number, are skipped; the second value
/// is how many.
pub fn leaves_from_records(records: &[Record], fields: &RecordFields) -> (IndexMap<Arc<str>, LeafRecord>, usize) {
    let mut leaves: IndexMap<Arc<str>, LeafRecord> = IndexMap::new();
    let mut skipped = 0;

    for (row, record) in records.iter().enumerate() {
        let location = text(record, &fields.location);
        let category = text(record, &fields.category);
        let weight = record.get(&fields.weight).and_then(Option::as_ref).and_then(Scalar::as_f64);

        let (Some(location), Some(category), Some(weight)) = (location, category, weight) else {
            warn!(row, "record lacks a location, category or weight, skipped");
            skipped += 1;
            continue;
        };
        if !weight.is_finite() || weight < 0.0 {
            warn!(row, weight, "record weight is not a non-negative number, skipped");
            skipped += 1;
            continue;
        }

        let entry = SubEntry::new(
            category,
            weight,
            text(record, &fields.tag_a).unwrap_or_default(),
            text(record, &fields.tag_b).unwrap_or_default(),
        );
        let id: Arc<str> = Arc::from(location);
        leaves.entry(Arc::clone(&id))
            .or_insert_with(|| LeafRecord::new(id, Vec::new()))
            .subentries
            .push(entry);
    }

    debug!(locations = leaves.len(), rows = records.len(), skipped, "grouped records");
    (leaves, skipped)
}
