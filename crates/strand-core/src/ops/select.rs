//! SEG: choose or filter the frontier.

use super::SelectParams;
use crate::NodeId;
use crate::index::EdgeIndex;
use crate::state::TraversalState;
use std::collections::BTreeSet;

/// Apply SEG.
///
/// - `nodeId` replaces the frontier with that single node.
/// - With an empty frontier and a type or property test, every indexed node
///   passing the test is selected.
/// - Otherwise the frontier is filtered in place.
///
/// `excludeVisited`, `intersectWith` and `maxResults` then narrow the result,
/// in that order. Truncation keeps the lowest node ids.
#[must_use]
pub fn apply(params: &SelectParams, state: &TraversalState, index: &EdgeIndex) -> TraversalState {
    let candidates: BTreeSet<NodeId> = if let Some(id) = &params.node_id {
        BTreeSet::from([id.clone()])
    } else if state.frontier.is_empty() && params.has_node_criteria() {
        scan(params, index)
    } else {
        state
            .frontier
            .iter()
            .filter(|id| params.accepts(index.node(id)))
            .cloned()
            .collect()
    };

    let mut frontier: BTreeSet<NodeId> = if params.exclude_visited {
        candidates.difference(&state.visited).cloned().collect()
    } else {
        candidates
    };

    if let Some(name) = &params.intersect_with {
        frontier = match state.named.get(name) {
            Some(named) => frontier.intersection(named).cloned().collect(),
            None => {
                tracing::debug!(name = %name, "SEG intersects with unknown name");
                BTreeSet::new()
            }
        };
    }

    if let Some(max) = params.max_results {
        frontier = frontier.into_iter().take(max).collect();
    }

    state.with_frontier(frontier)
}

fn scan(params: &SelectParams, index: &EdgeIndex) -> BTreeSet<NodeId> {
    if params.types.is_empty() {
        return index
            .nodes()
            .filter(|node| params.accepts(Some(node)))
            .map(|node| node.id.clone())
            .collect();
    }
    params
        .types
        .iter()
        .flat_map(|t| index.nodes_of_type(t))
        .filter(|id| params.accepts(index.node(id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, PropertyFilter};

    fn fixture() -> EdgeIndex {
        let mut index = EdgeIndex::new();
        index.index_node(Node::new("alice", "person").with_property("age", 34.0));
        index.index_node(Node::new("bob", "person").with_property("age", 19.0));
        index.index_node(Node::new("acme", "org"));
        index.index_node(Node::new("k1", "contract").with_property("status", "signed"));
        index
    }

    fn frontier(state: &TraversalState) -> Vec<&str> {
        state.frontier.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn node_id_gives_singleton() {
        let state = TraversalState::from_nodes(["bob"]);
        let out = apply(&SelectParams::node("alice"), &state, &fixture());
        assert_eq!(frontier(&out), vec!["alice"]);
    }

    #[test]
    fn empty_frontier_with_type_scans_index() {
        let out = apply(&SelectParams::of_type("person"), &TraversalState::new(), &fixture());
        assert_eq!(frontier(&out), vec!["alice", "bob"]);
    }

    #[test]
    fn empty_frontier_without_criteria_stays_empty() {
        let out = apply(&SelectParams::default(), &TraversalState::new(), &fixture());
        assert!(out.is_empty());
    }

    #[test]
    fn filters_existing_frontier() {
        let state = TraversalState::from_nodes(["alice", "acme", "k1"]);
        let out = apply(&SelectParams::of_type("person"), &state, &fixture());
        assert_eq!(frontier(&out), vec!["alice"]);

        let adults = SelectParams::of_type("person").with_filter(PropertyFilter::new(
            "age",
            crate::CompareOp::Gte,
            21.0,
        ));
        let out = apply(&adults, &TraversalState::from_nodes(["alice", "bob"]), &fixture());
        assert_eq!(frontier(&out), vec!["alice"]);
    }

    #[test]
    fn exclude_visited_intersect_and_truncate() {
        let mut state = TraversalState::from_nodes(["acme", "alice", "bob", "k1"]);
        state.visited.insert("acme".into());
        state
            .named
            .insert("people".to_string(), BTreeSet::from(["alice".into(), "bob".into()]));

        let params = SelectParams {
            exclude_visited: true,
            intersect_with: Some("people".to_string()),
            max_results: Some(1),
            ..SelectParams::default()
        };
        let out = apply(&params, &state, &fixture());
        assert_eq!(frontier(&out), vec!["alice"]);
    }

    #[test]
    fn unknown_nodes_fail_type_test() {
        let state = TraversalState::from_nodes(["ghost"]);
        let out = apply(&SelectParams::of_type("person"), &state, &fixture());
        assert!(out.is_empty());
        let out = apply(&SelectParams::default(), &state, &fixture());
        assert_eq!(frontier(&out), vec!["ghost"]);
    }
}
