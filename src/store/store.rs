use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    config::Conventions,
    error::{Error, Result},
    script::{BlockReader, Segment},
};
use super::entry::{EntryPattern, LeafRecord};

/// Location id → sub-entries, read from a data file. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct LeafStore {
    records: IndexMap<Arc<str>, LeafRecord>,
    duplicates: Vec<Arc<str>>,
    skipped: usize,
}

impl LeafStore {
    /// Read every location block of a data file.
    ///
    /// Container keywords are not locations. Lines of a location block that are
    /// not one-line sub-entries are ignored; unusable sub-entries are skipped
    /// with a warning. The first block of a repeated location wins.
    pub fn parse(text: &str, conventions: &Conventions) -> Result<Self> {
        let pattern = EntryPattern::new(conventions);
        let mut store = LeafStore::default();

        for segment in BlockReader::new(text).exclude(conventions.container_keywords()) {
            let Segment::Block(block) = segment else { continue };
            if !block.terminated() {
                return Err(Error::parse(block.start_line, format!("location '{}' is never closed", block.name)));
            }

            if store.records.contains_key(block.name) {
                warn!(location = block.name, line = block.start_line, "duplicate location block ignored");
                store.duplicates.push(Arc::from(block.name));
                continue;
            }

            let mut subentries = Vec::new();
            for (offset, line) in block.body.iter().enumerate() {
                match pattern.parse(line) {
                    Some(Ok(parsed)) => subentries.push(parsed.entry),
                    Some(Err(reason)) => {
                        warn!(location = block.name, line = block.start_line + offset + 1, %reason, "skipping sub-entry");
                        store.skipped += 1;
                    }
                    None => {}
                }
            }

            let id: Arc<str> = Arc::from(block.name);
            store.records.insert(Arc::clone(&id), LeafRecord { leaf_id: id, subentries });
        }

        debug!(locations = store.len(), skipped = store.skipped, "parsed data file");
        Ok(store)
    }

    /// Build a store from records already in memory.
    pub fn from_records(records: impl IntoIterator<Item = LeafRecord>) -> Self {
        let mut store = LeafStore::default();
        for record in records {
            if store.records.contains_key(&record.leaf_id) {
                store.duplicates.push(Arc::clone(&record.leaf_id));
            } else {
                store.records.insert(Arc::clone(&record.leaf_id), record);
            }
        }
        store
    }

    #[inline] pub fn get(&self, leaf_id: &str) -> Option<&LeafRecord> { self.records.get(leaf_id) }

    #[inline] pub fn contains(&self, leaf_id: &str) -> bool { self.records.contains_key(leaf_id) }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Records in file order.
    #[inline] pub fn iter(&self) -> impl Iterator<Item = &LeafRecord> + '_ { self.records.values() }

    /// Locations defined more than once.
    #[inline] pub fn duplicates(&self) -> &[Arc<str>] { &self.duplicates }

    /// Number of sub-entry lines that could not be used.
    #[inline] pub fn skipped(&self) -> usize { self.skipped }
}
