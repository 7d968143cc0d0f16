use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;

use super::node::{Node, NodeId, NodeKind};

/// Region → area → province → location tree, stored as an arena.
///
/// Ids are unique per kind. Every index keeps definition order, which is the
/// order used for resolution and traversal.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    regions: IndexMap<Arc<str>, NodeId>,
    areas: IndexMap<Arc<str>, NodeId>,
    provinces: IndexMap<Arc<str>, NodeId>,
    leaves: IndexMap<Arc<str>, NodeId>,
    duplicates: Vec<(NodeKind, Arc<str>)>,
    skipped: usize,
}

impl Hierarchy {
    fn index(&self, kind: NodeKind) -> &IndexMap<Arc<str>, NodeId> {
        match kind {
            NodeKind::Region => &self.regions,
            NodeKind::Area => &self.areas,
            NodeKind::Province => &self.provinces,
            NodeKind::Leaf => &self.leaves,
        }
    }

    fn index_mut(&mut self, kind: NodeKind) -> &mut IndexMap<Arc<str>, NodeId> {
        match kind {
            NodeKind::Region => &mut self.regions,
            NodeKind::Area => &mut self.areas,
            NodeKind::Province => &mut self.provinces,
            NodeKind::Leaf => &mut self.leaves,
        }
    }

    /// Add a node under `parent`, or return the existing node of the same kind
    /// and id. The second value is `false` for a repeated id, which is recorded
    /// as a duplicate.
    pub(super) fn intern(&mut self, kind: NodeKind, id: &str, parent: Option<NodeId>, line: usize) -> (NodeId, bool) {
        if let Some(&existing) = self.index(kind).get(id) {
            warn!(kind = kind.to_str(), id, line, "duplicate definition ignored");
            self.duplicates.push((kind, Arc::clone(&self.nodes[existing.index()].id)));
            return (existing, false);
        }

        let node_id = NodeId(self.nodes.len() as u32);
        let id: Arc<str> = Arc::from(id);
        self.nodes.push(Node { id: Arc::clone(&id), kind, parent, children: Vec::new(), line });
        self.index_mut(kind).insert(id, node_id);
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(node_id),
            None => self.roots.push(node_id),
        }
        (node_id, true)
    }

    pub(super) fn note_skipped(&mut self) { self.skipped += 1 }

    /// Number of nodes of every kind.
    #[inline] pub fn len(&self) -> usize { self.nodes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Number of nodes of one kind.
    #[inline] pub fn count(&self, kind: NodeKind) -> usize { self.index(kind).len() }

    #[inline] pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.index()] }

    /// Nodes without a parent (regions, and areas defined outside any region).
    #[inline] pub fn roots(&self) -> &[NodeId] { &self.roots }

    /// Repeated ids seen while building, in the order they were met.
    #[inline] pub fn duplicates(&self) -> &[(NodeKind, Arc<str>)] { &self.duplicates }

    /// Blocks and lines left out because they could not be parsed.
    #[inline] pub fn skipped(&self) -> usize { self.skipped }

    /// Look up a node by exact id.
    #[inline]
    pub fn find(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.index(kind).get(name).copied()
    }

    /// Nodes of one kind, in definition order.
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.index(kind).values().map(|&id| self.node(id))
    }

    #[inline] pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.node(id).parent }

    /// Parent chain from the immediate parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&id| self.parent(id))
    }

    /// Pre-order traversal of the subtree rooted at `id` (including `id`).
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Ids of the descendants of `id` that have the given kind, in definition order.
    pub fn descendants_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<Arc<str>> {
        self.descendants(id).into_iter()
            .map(|id| self.node(id))
            .filter(|node| node.kind == kind)
            .map(|node| Arc::clone(&node.id))
            .collect()
    }

    /// Every location under `id`, in definition order and without repeats.
    pub fn leaves_under(&self, id: NodeId) -> IndexSet<Arc<str>> {
        self.descendants_of_kind(id, NodeKind::Leaf).into_iter().collect()
    }
}
