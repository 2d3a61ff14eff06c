//! REC: bounded repeated hops with path collection.
//!
//! One path starts at every frontier node. Each round extends every active
//! path by one hop and the extensions become the new active set. A path never
//! steps onto a node it already contains; distinct paths may share nodes.
//!
//! The loop ends when
//! - `maxDepth` rounds have run (checked before each round),
//! - a round produces no extension,
//! - a path reaches `targetReached` (only reaching paths are collected),
//! - a freshly reached node satisfies `condition` (only those paths are
//!   collected), or
//! - with `fixedPoint`, a round produces no path that was not already
//!   collected.

use super::{CollectMode, RecurseParams};
use crate::index::{EdgeIndex, EdgeRef};
use crate::primitives::{DEFAULT_RECURSION_DEPTH, MAX_RECURSION_DEPTH};
use crate::state::{Path, TraversalState};
use crate::{EventId, NodeId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Apply REC.
#[must_use]
pub fn apply(params: &RecurseParams, state: &TraversalState, index: &EdgeIndex) -> TraversalState {
    let max_depth = params
        .until
        .max_depth
        .unwrap_or(DEFAULT_RECURSION_DEPTH)
        .min(MAX_RECURSION_DEPTH);
    let options = params.step.traverse_options();
    let target = params.until.target_reached.as_ref();
    let condition = params.until.condition.as_ref();
    let selective = target.is_some() || condition.is_some();

    let mut active: Vec<Path> = state.frontier.iter().cloned().map(Path::start).collect();
    let mut hits: Vec<Path> = match target {
        Some(target) => active
            .iter()
            .filter(|p| p.terminal() == Some(target))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut collected: Vec<Path> = Vec::new();
    let mut known_paths: BTreeSet<Vec<NodeId>> = BTreeSet::new();
    let mut reached: BTreeSet<NodeId> = BTreeSet::new();
    let mut traversed: Vec<EdgeRef> = Vec::new();
    let mut traversed_ids: BTreeSet<EventId> = BTreeSet::new();
    let mut last_terminals: BTreeSet<NodeId> = state.frontier.clone();
    let mut rounds = 0;

    while hits.is_empty() && rounds < max_depth {
        let mut next: Vec<Path> = Vec::new();

        for path in &active {
            let Some(tail) = path.terminal() else {
                continue;
            };
            for edge in index.traverse(tail, &options) {
                let Some(other) = EdgeIndex::get_other_end(&edge, tail) else {
                    continue;
                };
                if path.contains(other) {
                    continue;
                }
                if traversed_ids.insert(edge.id.clone()) {
                    traversed.push(Arc::clone(&edge));
                }
                reached.insert(other.clone());
                next.push(path.extend(Arc::clone(&edge), other.clone()));
            }
        }

        if next.is_empty() {
            break;
        }
        rounds += 1;
        let new_paths = if params.until.fixed_point {
            next.iter()
                .filter(|p| known_paths.insert(p.nodes.clone()))
                .count()
        } else {
            next.len()
        };

        if let Some(target) = target {
            hits.extend(next.iter().filter(|p| p.terminal() == Some(target)).cloned());
        }
        if let Some(condition) = condition {
            let satisfied: Vec<Path> = next
                .iter()
                .filter(|p| !hits.contains(p))
                .filter(|p| p.terminal().is_some_and(|n| condition.matches(index.node(n))))
                .cloned()
                .collect();
            hits.extend(satisfied);
        }

        last_terminals = next.iter().filter_map(Path::terminal).cloned().collect();
        if !selective {
            collected.extend(next.iter().cloned());
        }
        if params.until.fixed_point && new_paths == 0 {
            tracing::debug!(rounds, "REC reached a fixed point");
            break;
        }
        active = next;
    }

    if selective {
        collected = hits;
    }
    tracing::debug!(rounds, paths = collected.len(), reached = reached.len(), "REC finished");

    let mut next_state = state.clone();
    next_state.depth += rounds;
    next_state.visited.extend(state.frontier.iter().cloned());
    next_state.visited.extend(reached.iter().cloned());

    next_state.frontier = match params.collect {
        CollectMode::Paths => collected.iter().filter_map(Path::terminal).cloned().collect(),
        CollectMode::Nodes => reached,
        CollectMode::TerminalNodes if selective => {
            collected.iter().filter_map(Path::terminal).cloned().collect()
        }
        CollectMode::TerminalNodes => last_terminals,
    };

    if params.step.return_mode.includes_edges() {
        match params.collect {
            CollectMode::Paths => {
                let mut seen: BTreeSet<EventId> = BTreeSet::new();
                for edge in collected.iter().flat_map(|p| p.edges.iter()) {
                    if seen.insert(edge.id.clone()) {
                        next_state.edges.push(Arc::clone(edge));
                    }
                }
            }
            CollectMode::Nodes | CollectMode::TerminalNodes => {
                next_state.edges.extend(traversed);
            }
        }
    }

    if params.collect == CollectMode::Paths {
        next_state.paths.extend(collected);
    }
    next_state
}
