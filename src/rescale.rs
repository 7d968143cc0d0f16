//! Proportional rescaling of location records to a target total.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    store::{LeafRecord, LeafStore},
};

/// Result of multiplying every found sub-entry by one factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescaleOutcome {
    pub scale_factor: f64,
    pub previous_total: f64,
    pub new_total: f64,
    /// Rescaled copies, in the order the locations were found.
    pub per_leaf: IndexMap<Arc<str>, LeafRecord>,
}

/// Scale the records of `found` so their combined weight equals `target`.
///
/// One factor is applied to every sub-entry, which keeps each sub-entry's
/// share of its location and each location's share of the total. Weights are
/// then rounded to `precision` decimals, the units lost to rounding going to
/// the sub-entries with the largest remainders, so the rounded weights add up
/// to `target` at that precision and a rewritten file reads back the same
/// total. Zero weights stay zero. The store is not modified. `target` may be
/// zero; the current total under `name` may not.
pub fn rescale(
    store: &LeafStore,
    name: &str,
    found: &[(Arc<str>, f64)],
    target: f64,
    tolerance: f64,
    precision: usize,
) -> Result<RescaleOutcome> {
    if !target.is_finite() || target < 0.0 {
        return Err(Error::InvalidTarget(target));
    }

    let previous_total: f64 = found.iter().map(|(_, subtotal)| subtotal).sum();
    if previous_total <= 0.0 {
        return Err(Error::ZeroTotal { name: name.to_string() });
    }

    let scale_factor = target / previous_total;
    debug!(node = name, previous_total, target, scale_factor, "rescaling");

    let mut per_leaf: IndexMap<Arc<str>, LeafRecord> = found.iter()
        .filter_map(|(id, _)| store.get(id))
        .map(|record| (Arc::clone(&record.leaf_id), record.scaled(scale_factor)))
        .collect();
    round_to_total(&mut per_leaf, target, precision);

    let new_total: f64 = per_leaf.values().map(LeafRecord::total).sum();
    let allowed = tolerance.max(0.5 * 10f64.powi(-(precision as i32)));
    if (new_total - target).abs() > allowed {
        return Err(Error::InternalConsistency { expected: target, actual: new_total, tolerance: allowed });
    }

    info!(node = name, locations = per_leaf.len(), previous_total, new_total, scale_factor, "rescaled records");
    Ok(RescaleOutcome { scale_factor, previous_total, new_total, per_leaf })
}

/// Round every weight to `precision` decimals by largest remainder, so the
/// rounded weights sum to `target` rounded to the same precision.
fn round_to_total(per_leaf: &mut IndexMap<Arc<str>, LeafRecord>, target: f64, precision: usize) {
    let unit = 10f64.powi(precision as i32);
    let mut remainders = Vec::new();
    let mut floored = 0.0;

    for (leaf, record) in per_leaf.values_mut().enumerate() {
        for (slot, entry) in record.subentries.iter_mut().enumerate() {
            let mut units = entry.weight * unit;
            if (units - units.round()).abs() < 1e-6 {
                units = units.round();
            }
            let whole = units.floor();
            floored += whole;
            if units > whole {
                remainders.push((units - whole, leaf, slot));
            }
            entry.weight = whole;
        }
    }

    // Stable sort: ties go to the earlier sub-entry.
    remainders.sort_by(|a, b| b.0.total_cmp(&a.0));
    let missing = ((target * unit).round() - floored).max(0.0) as usize;
    for &(_, leaf, slot) in remainders.iter().take(missing) {
        if let Some((_, record)) = per_leaf.get_index_mut(leaf) {
            record.subentries[slot].weight += 1.0;
        }
    }

    for record in per_leaf.values_mut() {
        for entry in &mut record.subentries {
            entry.weight /= unit;
        }
    }
}
