//! CON: one hop from every frontier node.

use super::ConnectParams;
use crate::index::EdgeIndex;
use crate::state::TraversalState;
use crate::{EventId, NodeId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Apply CON.
///
/// Every frontier node is expanded along the edges `traverse` returns for the
/// step's options and joins `visited`. Depending on `return`, the far
/// endpoints replace the frontier, the edges are appended, or both. Depth
/// grows by one.
#[must_use]
pub fn apply(params: &ConnectParams, state: &TraversalState, index: &EdgeIndex) -> TraversalState {
    let options = params.traverse_options();

    let mut reached: BTreeSet<NodeId> = BTreeSet::new();
    let mut edges = state.edges.clone();
    let mut seen: BTreeSet<EventId> = BTreeSet::new();
    let mut visited = state.visited.clone();

    for node in &state.frontier {
        visited.insert(node.clone());
        for edge in index.traverse(node, &options) {
            let Some(other) = EdgeIndex::get_other_end(&edge, node) else {
                continue;
            };
            reached.insert(other.clone());
            if params.return_mode.includes_edges() && seen.insert(edge.id.clone()) {
                edges.push(Arc::clone(&edge));
            }
        }
    }

    let frontier = if params.return_mode.includes_nodes() {
        reached
    } else {
        state.frontier.clone()
    };

    TraversalState {
        frontier,
        edges,
        visited,
        depth: state.depth + 1,
        ..state.clone()
    }
}
