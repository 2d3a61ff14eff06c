//! SUP and SYN: collapse accumulated paths, or reduce them to outputs.

use super::{AggregateFn, SuperposeMode, SuperposeParams, SynthesizeMode, SynthesizeParams};
use crate::state::{Path, TraversalState};
use crate::{NodeId, PropertyValue};
use std::collections::BTreeSet;

/// Apply SUP.
#[must_use]
pub fn superpose(params: &SuperposeParams, state: &TraversalState) -> TraversalState {
    match params.mode {
        SuperposeMode::Shortest => shortest(state),
        SuperposeMode::AllPaths => state.clone(),
        SuperposeMode::AllNodes => union_nodes(state),
    }
}

/// Apply SYN.
#[must_use]
pub fn synthesize(params: &SynthesizeParams, state: &TraversalState) -> TraversalState {
    match params.mode {
        SynthesizeMode::ShortestPath => shortest(state),
        SynthesizeMode::AllPaths => state.clone(),
        SynthesizeMode::UnionNodes => union_nodes(state),
        SynthesizeMode::Count => {
            let mut next = state.clone();
            next.outputs.insert(
                "node_count".to_string(),
                PropertyValue::Number(state.frontier.len() as f64),
            );
            next.outputs.insert(
                "path_count".to_string(),
                PropertyValue::Number(state.paths.len() as f64),
            );
            next
        }
        SynthesizeMode::Aggregate => aggregate(params, state),
    }
}

/// Keep only the shortest path. Ties go to the earliest collected.
fn shortest(state: &TraversalState) -> TraversalState {
    let Some(best) = state.paths.iter().min_by_key(|p| p.len()) else {
        return state.clone();
    };
    TraversalState {
        paths: vec![best.clone()],
        ..state.clone()
    }
}

/// Replace the frontier with every node on every path.
fn union_nodes(state: &TraversalState) -> TraversalState {
    let nodes: BTreeSet<NodeId> = state
        .paths
        .iter()
        .flat_map(|p: &Path| p.nodes.iter().cloned())
        .collect();
    state.with_frontier(nodes)
}

/// Reduce a numeric edge property over the accumulated edges.
///
/// Edges without the property, or with a non-numeric value, are skipped.
/// With no values `count` is 0 and every other function is `null`.
fn aggregate(params: &SynthesizeParams, state: &TraversalState) -> TraversalState {
    let Some(property) = params.property.as_deref() else {
        tracing::warn!("SYN aggregate without a property, skipping");
        return state.clone();
    };

    let values: Vec<f64> = state
        .edges
        .iter()
        .filter_map(|edge| edge.properties.get(property).and_then(PropertyValue::as_f64))
        .collect();

    let result = match params.function {
        AggregateFn::Count => Some(values.len() as f64),
        AggregateFn::Sum if !values.is_empty() => Some(values.iter().sum()),
        AggregateFn::Avg if !values.is_empty() => {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
        AggregateFn::Min => values.iter().copied().reduce(f64::min),
        AggregateFn::Max => values.iter().copied().reduce(f64::max),
        AggregateFn::Sum | AggregateFn::Avg => None,
    };

    let output = params
        .output
        .clone()
        .unwrap_or_else(|| format!("{}_{property}", params.function.name()));

    let mut next = state.clone();
    next.outputs
        .insert(output, result.map_or(PropertyValue::Null, PropertyValue::Number));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Edge;
    use std::sync::Arc;

    fn path(nodes: &[&str]) -> Path {
        let mut p = Path::start(nodes[0].into());
        for (i, pair) in nodes.windows(2).enumerate() {
            let edge = Arc::new(Edge::new(format!("e{i}"), pair[0], pair[1], "r"));
            p = p.extend(edge, pair[1].into());
        }
        p
    }

    fn with_paths(paths: Vec<Path>) -> TraversalState {
        TraversalState {
            paths,
            ..TraversalState::from_nodes(["x"])
        }
    }

    #[test]
    fn shortest_keeps_first_minimum() {
        let first = path(&["a", "b", "d"]);
        let second = path(&["a", "c", "d"]);
        let long = path(&["a", "b", "c", "d"]);
        let state = with_paths(vec![long, first.clone(), second]);

        let out = superpose(
            &SuperposeParams {
                mode: SuperposeMode::Shortest,
            },
            &state,
        );
        assert_eq!(out.paths, vec![first]);
        assert_eq!(out.frontier, state.frontier);
    }

    #[test]
    fn all_nodes_flattens_paths() {
        let state = with_paths(vec![path(&["a", "b"]), path(&["c", "d"])]);
        let out = superpose(
            &SuperposeParams {
                mode: SuperposeMode::AllNodes,
            },
            &state,
        );
        assert_eq!(out.frontier.len(), 4);

        let same = synthesize(&SynthesizeParams::new(SynthesizeMode::UnionNodes), &state);
        assert_eq!(same.frontier, out.frontier);
    }

    #[test]
    fn all_paths_is_identity() {
        let state = with_paths(vec![path(&["a", "b"])]);
        let out = synthesize(&SynthesizeParams::new(SynthesizeMode::AllPaths), &state);
        assert_eq!(out, state);
    }

    #[test]
    fn count_outputs() {
        let state = with_paths(vec![path(&["a", "b"]), path(&["a", "c"])]);
        let out = synthesize(&SynthesizeParams::new(SynthesizeMode::Count), &state);
        assert_eq!(out.outputs["node_count"], PropertyValue::Number(1.0));
        assert_eq!(out.outputs["path_count"], PropertyValue::Number(2.0));
    }

    #[test]
    fn aggregates_numeric_edge_property() {
        let mut state = TraversalState::new();
        state.edges = vec![
            Arc::new(Edge::new("e1", "a", "b", "paid").with_property("amount", 10.0)),
            Arc::new(Edge::new("e2", "a", "c", "paid").with_property("amount", 30.0)),
            Arc::new(Edge::new("e3", "a", "d", "paid").with_property("amount", "n/a")),
            Arc::new(Edge::new("e4", "a", "e", "paid")),
        ];

        let run = |f| synthesize(&SynthesizeParams::aggregate(f, "amount"), &state);
        assert_eq!(run(AggregateFn::Sum).outputs["sum_amount"], PropertyValue::Number(40.0));
        assert_eq!(run(AggregateFn::Avg).outputs["avg_amount"], PropertyValue::Number(20.0));
        assert_eq!(run(AggregateFn::Min).outputs["min_amount"], PropertyValue::Number(10.0));
        assert_eq!(run(AggregateFn::Max).outputs["max_amount"], PropertyValue::Number(30.0));
        assert_eq!(run(AggregateFn::Count).outputs["count_amount"], PropertyValue::Number(2.0));
    }

    #[test]
    fn aggregate_over_nothing() {
        let params = SynthesizeParams {
            output: Some("total".to_string()),
            ..SynthesizeParams::aggregate(AggregateFn::Sum, "amount")
        };
        let out = synthesize(&params, &TraversalState::new());
        assert_eq!(out.outputs["total"], PropertyValue::Null);

        let count = synthesize(
            &SynthesizeParams::aggregate(AggregateFn::Count, "amount"),
            &TraversalState::new(),
        );
        assert_eq!(count.outputs["count_amount"], PropertyValue::Number(0.0));
    }
}
