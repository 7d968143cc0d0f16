//! Current totals of the locations under a resolved node.

use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::warn;

use crate::{
    error::{Error, Result},
    hierarchy::Resolution,
    store::LeafStore,
};

/// Totals of a set of locations, split into those with data and those without.
/// Both lists follow the order the ids were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub total: f64,
    pub found: Vec<(Arc<str>, f64)>,
    pub missing: Vec<Arc<str>>,
}

impl Aggregate {
    /// Sum the records of `leaf_ids`, never failing.
    pub fn tally<'a>(store: &LeafStore, leaf_ids: impl IntoIterator<Item = &'a Arc<str>>) -> Self {
        let mut aggregate = Aggregate::default();
        for id in leaf_ids {
            match store.get(id) {
                Some(record) => {
                    let subtotal = record.total();
                    aggregate.total += subtotal;
                    aggregate.found.push((Arc::clone(id), subtotal));
                }
                None => aggregate.missing.push(Arc::clone(id)),
            }
        }
        aggregate
    }

    #[inline] pub fn len(&self) -> usize { self.found.len() + self.missing.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Sum the records of `leaf_ids` for rescaling `name`.
///
/// Fails with `EmptyAggregate` for an empty id set and `ZeroTotal` when the
/// locations carry no weight. Missing locations are logged and reported, not fatal.
pub fn aggregate(store: &LeafStore, name: &str, leaf_ids: &IndexSet<Arc<str>>) -> Result<Aggregate> {
    if leaf_ids.is_empty() {
        return Err(Error::EmptyAggregate { name: name.to_string() });
    }

    let aggregate = Aggregate::tally(store, leaf_ids);
    if !aggregate.missing.is_empty() {
        warn!(node = name, missing = aggregate.missing.len(), "locations without population data");
    }
    if aggregate.total == 0.0 {
        return Err(Error::ZeroTotal { name: name.to_string() });
    }
    Ok(aggregate)
}

/// A resolution together with the current totals of its locations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub requested_name: String,
    pub matched_name: Arc<str>,
    pub matched_leaf_ids: IndexSet<Arc<str>>,
    pub found: Vec<(Arc<str>, f64)>,
    pub missing: Vec<Arc<str>>,
    pub total: f64,
}

impl ResolutionResult {
    pub fn new(resolution: &Resolution, aggregate: &Aggregate) -> Self {
        Self {
            requested_name: resolution.requested.clone(),
            matched_name: Arc::clone(&resolution.matched),
            matched_leaf_ids: resolution.leaves.clone(),
            found: aggregate.found.clone(),
            missing: aggregate.missing.clone(),
            total: aggregate.total,
        }
    }
}
