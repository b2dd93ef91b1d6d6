//! Arena-backed value graphs.
//!
//! A [`ValueGraph`] owns every node of one extended value in a flat arena and
//! designates one of them as the root. Node identity is the arena index: two
//! child slots holding the same [`NodeId`] are the *same* value, which is how
//! shared substructure and cycles are expressed without interior mutability.

use rustc_hash::FxHashSet;

use crate::model::{Node, PropKey};

/// Index of a node within its owning [`ValueGraph`].
///
/// Ids are only meaningful against the graph that allocated them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An extended value: a node arena plus a root designation.
///
/// The arena is append-only. Cyclic values are built by allocating a
/// composite first, then patching its child list through [`node_mut`]:
///
/// ```rust
/// use xjson::{Node, PropKey, ValueGraph};
///
/// let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
/// let root = graph.root();
/// if let Some(Node::Object(members)) = graph.node_mut(root) {
///     members.push((PropKey::String("self".into()), root));
/// }
/// ```
///
/// [`node_mut`]: ValueGraph::node_mut
#[derive(Debug, Clone, Default)]
pub struct ValueGraph {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ValueGraph {
    /// Creates an empty graph. The root points at index 0, which exists only
    /// once a first node is allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph whose first allocated node is the root.
    pub fn with_root(node: Node) -> Self {
        let mut graph = Self::new();
        let root = graph.alloc(node);
        graph.root = root;
        graph
    }

    /// Appends a node to the arena and returns its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Returns the node for an id, or None if the id is dangling.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Returns a mutable reference to the node for an id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Returns the root id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Redesignates the root.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Returns the number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural equality of the two graphs' roots.
    ///
    /// See [`node_deep_eq`](ValueGraph::node_deep_eq) for the comparison
    /// rules.
    pub fn deep_eq(&self, other: &ValueGraph) -> bool {
        self.node_deep_eq(self.root, other, other.root)
    }

    /// Structural equality of one node in `self` against one in `other`.
    ///
    /// Composites compare member-wise in order, numbers compare NaN equal to
    /// NaN, dates by instant, patterns by source and flags, binary kinds by
    /// byte content. Node identity is ignored: two structurally identical
    /// values compare equal even when sharing differs. Cycles terminate via a
    /// visited-pair set, so mutually recursive graphs compare in finite time.
    pub fn node_deep_eq(&self, a: NodeId, other: &ValueGraph, b: NodeId) -> bool {
        let mut visited = FxHashSet::default();
        self.eq_nodes(a, other, b, &mut visited)
    }

    fn eq_nodes(
        &self,
        a: NodeId,
        other: &ValueGraph,
        b: NodeId,
        visited: &mut FxHashSet<(u32, u32)>,
    ) -> bool {
        // A revisited pair is presumed equal; a mismatch on the cycle is
        // caught at the first divergent member instead.
        if !visited.insert((a.0, b.0)) {
            return true;
        }

        let (left, right) = match (self.node(a), other.node(b)) {
            (Some(left), Some(right)) => (left, right),
            _ => return false,
        };

        match (left, right) {
            (Node::Undefined, Node::Undefined) => true,
            (Node::Hole, Node::Hole) => true,
            (Node::Null, Node::Null) => true,
            (Node::Bool(x), Node::Bool(y)) => x == y,
            (Node::Number(x), Node::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Node::String(x), Node::String(y)) => x == y,
            (Node::BigInt(x), Node::BigInt(y)) => x == y,
            (Node::Date { epoch_ms: x }, Node::Date { epoch_ms: y }) => x == y,
            (
                Node::RegExp { source: s1, flags: f1 },
                Node::RegExp { source: s2, flags: f2 },
            ) => s1 == s2 && f1 == f2,
            (Node::Symbol(x), Node::Symbol(y)) => x == y,
            (Node::Buffer(x), Node::Buffer(y)) => x == y,
            (Node::ArrayBuffer(x), Node::ArrayBuffer(y)) => x == y,
            (
                Node::TypedArray { kind: k1, bytes: b1 },
                Node::TypedArray { kind: k2, bytes: b2 },
            ) => k1 == k2 && b1 == b2,
            (Node::DataView { bytes: x }, Node::DataView { bytes: y }) => x == y,
            (Node::Array(xs), Node::Array(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(x, y)| self.eq_nodes(*x, other, *y, visited))
            }
            (Node::Object(xs), Node::Object(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|((kx, vx), (ky, vy))| {
                        kx == ky && self.eq_nodes(*vx, other, *vy, visited)
                    })
            }
            (Node::Set(xs), Node::Set(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(x, y)| self.eq_nodes(*x, other, *y, visited))
            }
            (Node::Map(xs), Node::Map(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|((kx, vx), (ky, vy))| {
                        self.eq_nodes(*kx, other, *ky, visited)
                            && self.eq_nodes(*vx, other, *vy, visited)
                    })
            }
            (Node::Error(x), Node::Error(y)) => {
                x.name == y.name
                    && x.message == y.message
                    && x.stack == y.stack
                    && x.props.len() == y.props.len()
                    && x.props.iter().zip(&y.props).all(|((kx, vx), (ky, vy))| {
                        kx == ky && self.eq_nodes(*vx, other, *vy, visited)
                    })
            }
            _ => false,
        }
    }

    /// Convenience: allocates a string-keyed member onto an object node.
    ///
    /// Does nothing if `object` does not name an `Object` node.
    pub fn push_member(&mut self, object: NodeId, key: impl Into<String>, value: NodeId) {
        if let Some(Node::Object(members)) = self.node_mut(object) {
            members.push((PropKey::String(key.into()), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorValue;

    #[test]
    fn test_alloc_and_root() {
        let mut graph = ValueGraph::with_root(Node::Array(Vec::new()));
        assert_eq!(graph.len(), 1);
        let child = graph.alloc(Node::Number(1.0));
        if let Some(Node::Array(slots)) = graph.node_mut(graph.root()) {
            slots.push(child);
        }
        assert_eq!(graph.len(), 2);
        assert!(matches!(graph.node(child), Some(Node::Number(_))));
    }

    #[test]
    fn test_empty_graph_has_no_root_node() {
        let graph = ValueGraph::new();
        assert!(graph.is_empty());
        assert!(graph.node(graph.root()).is_none());
    }

    #[test]
    fn test_deep_eq_primitives() {
        let a = ValueGraph::with_root(Node::Number(f64::NAN));
        let b = ValueGraph::with_root(Node::Number(f64::NAN));
        assert!(a.deep_eq(&b));

        let c = ValueGraph::with_root(Node::Number(1.0));
        assert!(!a.deep_eq(&c));

        let undef = ValueGraph::with_root(Node::Undefined);
        let hole = ValueGraph::with_root(Node::Hole);
        assert!(!undef.deep_eq(&hole));
    }

    #[test]
    fn test_deep_eq_ignores_sharing() {
        // One graph shares a leaf, the other duplicates it.
        let mut shared = ValueGraph::with_root(Node::Array(Vec::new()));
        let leaf = shared.alloc(Node::String("x".to_string()));
        if let Some(Node::Array(slots)) = shared.node_mut(shared.root()) {
            slots.push(leaf);
            slots.push(leaf);
        }

        let mut duplicated = ValueGraph::with_root(Node::Array(Vec::new()));
        let l1 = duplicated.alloc(Node::String("x".to_string()));
        let l2 = duplicated.alloc(Node::String("x".to_string()));
        if let Some(Node::Array(slots)) = duplicated.node_mut(duplicated.root()) {
            slots.push(l1);
            slots.push(l2);
        }

        assert!(shared.deep_eq(&duplicated));
    }

    #[test]
    fn test_deep_eq_terminates_on_cycles() {
        let build = || {
            let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
            let root = graph.root();
            graph.push_member(root, "self", root);
            graph
        };
        let a = build();
        let b = build();
        assert!(a.deep_eq(&b));
    }

    #[test]
    fn test_deep_eq_error_values() {
        let build = |message: &str| {
            let mut graph = ValueGraph::with_root(Node::Null);
            let code = graph.alloc(Node::Number(7.0));
            let mut err = ErrorValue::with_name("TypeError", Some(message.to_string()));
            err.props.push((PropKey::String("code".to_string()), code));
            let root = graph.alloc(Node::Error(err));
            graph.set_root(root);
            graph
        };
        assert!(build("boom").deep_eq(&build("boom")));
        assert!(!build("boom").deep_eq(&build("bang")));
    }

    #[test]
    fn test_deep_eq_object_order_sensitive() {
        let build = |first: &str, second: &str| {
            let mut graph = ValueGraph::with_root(Node::Object(Vec::new()));
            let root = graph.root();
            let a = graph.alloc(Node::Number(1.0));
            let b = graph.alloc(Node::Number(2.0));
            graph.push_member(root, first, a);
            graph.push_member(root, second, b);
            graph
        };
        assert!(build("a", "b").deep_eq(&build("a", "b")));
        assert!(!build("a", "b").deep_eq(&build("b", "a")));
    }
}
