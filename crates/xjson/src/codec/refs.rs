//! Reference tables for shared and cyclic identity.
//!
//! Both tables are scoped to a single encode or decode call; ids are never
//! persisted or reused across calls.

use rustc_hash::FxHashMap;

use crate::model::NodeId;

/// Encode-side table: sequential (identity, wire id) pairs, used only when
/// cycle preservation is enabled.
///
/// Lookup is a linear scan by node identity. Over n distinct composites this
/// is O(n²) total, which is acceptable at the graph sizes the codec targets;
/// it is a scalability caveat, not a correctness one.
#[derive(Debug, Clone, Default)]
pub struct SeenTable {
    entries: Vec<(NodeId, u32)>,
    next_id: u32,
}

impl SeenTable {
    /// Creates an empty table. Wire ids start at 1.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Finds the wire id previously assigned to a node, if any.
    pub fn lookup(&self, node: NodeId) -> Option<u32> {
        self.entries
            .iter()
            .find(|(seen, _)| *seen == node)
            .map(|(_, id)| *id)
    }

    /// Assigns the next wire id to a node and records the pair.
    pub fn assign(&mut self, node: NodeId) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((node, id));
        id
    }

    /// Returns the number of assigned ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no ids have been assigned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode-side table: wire id to the node constructed for it.
///
/// Entries are stored as soon as a composite is allocated, before its
/// children decode, so a wrapper referencing its own ancestor resolves to
/// the still-being-filled node.
#[derive(Debug, Clone, Default)]
pub struct RefTable {
    refs: FxHashMap<u32, NodeId>,
}

impl RefTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the node constructed for a wire id.
    pub fn store(&mut self, id: u32, node: NodeId) {
        self.refs.insert(id, node);
    }

    /// Resolves a wire id to its constructed node.
    pub fn resolve(&self, id: u32) -> Option<NodeId> {
        self.refs.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, ValueGraph};

    #[test]
    fn test_seen_table_assigns_sequentially_from_one() {
        let mut graph = ValueGraph::new();
        let a = graph.alloc(Node::Null);
        let b = graph.alloc(Node::Null);

        let mut seen = SeenTable::new();
        assert_eq!(seen.lookup(a), None);
        assert_eq!(seen.assign(a), 1);
        assert_eq!(seen.assign(b), 2);
        assert_eq!(seen.lookup(a), Some(1));
        assert_eq!(seen.lookup(b), Some(2));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_ref_table_store_resolve() {
        let mut graph = ValueGraph::new();
        let node = graph.alloc(Node::Null);

        let mut refs = RefTable::new();
        assert_eq!(refs.resolve(1), None);
        refs.store(1, node);
        assert_eq!(refs.resolve(1), Some(node));
        assert_eq!(refs.resolve(2), None);
    }
}
