use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::error::{Error, Result};
use super::{hierarchy::Hierarchy, node::NodeKind};

/// A node to rebalance, named either as a region or as an area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Region(String),
    Area(String),
}

impl Target {
    #[inline]
    pub fn name(&self) -> &str {
        match self { Target::Region(name) | Target::Area(name) => name }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self { Target::Region(_) => NodeKind::Region, Target::Area(_) => NodeKind::Area }
    }
}

/// The node a requested name resolved to, and the locations beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub requested: String,
    pub matched: Arc<str>,
    pub kind: NodeKind,
    /// Areas covered by the match (just the matched area for area targets).
    pub areas: Vec<Arc<str>>,
    /// Locations in definition order, without repeats.
    pub leaves: IndexSet<Arc<str>>,
}

impl Resolution {
    /// Whether the match came from substring matching rather than the exact name.
    #[inline] pub fn is_fuzzy(&self) -> bool { *self.matched != *self.requested }
}

impl Hierarchy {
    /// Area id matching `name`: exact first, then (if `fuzzy`) the first area in
    /// definition order whose id contains `name` or is contained in it,
    /// ignoring case.
    pub fn match_area(&self, name: &str, fuzzy: bool) -> Option<Arc<str>> {
        if let Some(id) = self.find(NodeKind::Area, name) {
            return Some(Arc::clone(&self.node(id).id));
        }
        if !fuzzy || name.trim().is_empty() { return None }

        let needle = name.to_lowercase();
        self.nodes_of(NodeKind::Area)
            .find(|node| {
                let key = node.id.to_lowercase();
                key.contains(&needle) || needle.contains(&key)
            })
            .map(|node| Arc::clone(&node.id))
    }

    /// Resolve an area name to its locations.
    pub fn resolve(&self, name: &str, fuzzy: bool) -> Result<Resolution> {
        let matched = self.match_area(name, fuzzy)
            .ok_or_else(|| Error::NotFound { kind: NodeKind::Area, name: name.to_string() })?;

        if *matched != *name {
            info!(requested = name, matched = &*matched, "area resolved by substring match");
        }

        let id = self.find(NodeKind::Area, &matched)
            .ok_or_else(|| Error::NotFound { kind: NodeKind::Area, name: name.to_string() })?;
        let leaves = self.leaves_under(id);
        debug!(area = &*matched, leaves = leaves.len(), "resolved area");

        Ok(Resolution {
            requested: name.to_string(),
            areas: vec![Arc::clone(&matched)],
            matched,
            kind: NodeKind::Area,
            leaves,
        })
    }

    /// Areas strictly inside the named region, in definition order. A region
    /// with no areas yields an empty list; an unknown region is `NotFound`.
    pub fn areas_of_region(&self, name: &str) -> Result<Vec<Arc<str>>> {
        let id = self.find(NodeKind::Region, name)
            .ok_or_else(|| Error::NotFound { kind: NodeKind::Region, name: name.to_string() })?;
        Ok(self.descendants_of_kind(id, NodeKind::Area))
    }

    /// Resolve a region name (exact) to its areas and their locations.
    pub fn resolve_region(&self, name: &str) -> Result<Resolution> {
        let areas = self.areas_of_region(name)?;
        let mut leaves = IndexSet::new();
        for area in &areas {
            if let Some(id) = self.find(NodeKind::Area, area) {
                leaves.extend(self.leaves_under(id));
            }
        }
        debug!(region = name, areas = areas.len(), leaves = leaves.len(), "resolved region");

        let matched = self.find(NodeKind::Region, name)
            .map(|id| Arc::clone(&self.node(id).id))
            .unwrap_or_else(|| Arc::from(name));

        Ok(Resolution { requested: name.to_string(), matched, kind: NodeKind::Region, areas, leaves })
    }

    pub fn resolve_target(&self, target: &Target, fuzzy: bool) -> Result<Resolution> {
        match target {
            Target::Region(name) => self.resolve_region(name),
            Target::Area(name) => self.resolve(name, fuzzy),
        }
    }
}
