//! Confusion sets
//!
//! The confusion set at a node is the next layer of predicate nodes reachable
//! from it without passing through another predicate, restricted to those
//! with data available. Non-predicate nodes are transparent to the traversal
//! but record whether an aggregation or paragraph boundary was crossed.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::network::{NodeId, NodeKind, SchemaNetwork};
use crate::search::{Bindings, Search};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoratedNode {
    pub node: NodeId,
    /// An aggregation boundary lies on the path to `node`.
    pub aggregation: bool,
    /// A paragraph boundary lies on the path to `node`.
    pub paragraph: bool,
}

impl DecoratedNode {
    pub fn plain(node: NodeId) -> Self {
        Self {
            node,
            aggregation: false,
            paragraph: false,
        }
    }
}

/// Predicate nodes reachable from `from` without crossing another predicate,
/// in breadth-first discovery order. `from` itself is only revisited if a
/// loop leads back to it.
pub fn boundary_candidates(network: &SchemaNetwork, from: NodeId) -> Vec<DecoratedNode> {
    let mut candidates = Vec::new();
    let mut seen: HashSet<DecoratedNode> = HashSet::new();
    let mut queue: VecDeque<DecoratedNode> = network
        .node(from)
        .outgoing
        .iter()
        .map(|&next| DecoratedNode::plain(next))
        .collect();

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        let node = network.node(current.node);
        if node.is_predicate() {
            candidates.push(current);
            continue;
        }
        let aggregation =
            current.aggregation || matches!(node.kind, NodeKind::AggregationBoundary);
        let paragraph = current.paragraph || matches!(node.kind, NodeKind::ParagraphBoundary);
        queue.extend(node.outgoing.iter().map(|&next| DecoratedNode {
            node: next,
            aggregation,
            paragraph,
        }));
    }
    candidates
}

impl<'a, 'f> Search<'a, 'f> {
    /// Boundary candidates of `from` that can be instantiated under
    /// `globals`. Searches (and caches) every candidate not seen before.
    pub fn confusion_set(&mut self, from: NodeId, globals: &Bindings<'f>) -> Vec<DecoratedNode> {
        let candidates = boundary_candidates(self.network(), from);
        debug!(candidates = candidates.len(), "checking boundary nodes");
        candidates
            .into_iter()
            .filter(|candidate| self.can_be_instantiated(candidate.node, globals))
            .collect()
    }
}
