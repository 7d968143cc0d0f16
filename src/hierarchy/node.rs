use std::{fmt, sync::Arc};

use serde::Serialize;

/// Level of a node in the containment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Region,     // Highest-level entity
    Area,       // Area -> Region
    Province,   // Province -> Area
    Leaf,       // Lowest-level entity (location)
}

impl NodeKind {
    pub fn to_str(&self) -> &'static str {
        match self {
            NodeKind::Region => "region",
            NodeKind::Area => "area",
            NodeKind::Province => "province",
            NodeKind::Leaf => "location",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.to_str()) }
}

/// Index of a node in the hierarchy arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) u32);

impl NodeId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

/// A named entity in the region/area/province/location tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Arc<str>,
    pub kind: NodeKind,
    /// Arena lookup, not an owning reference.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 1-based line of the first definition.
    pub line: usize,
}

impl Node {
    #[inline] pub fn is_leaf(&self) -> bool { self.kind == NodeKind::Leaf }
}
