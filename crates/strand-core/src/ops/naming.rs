//! DES, ALT and INS: named results and explicit frontier additions.

use super::{InsertParams, NameParams};
use crate::state::TraversalState;

/// DES: save the frontier under `name`, replacing any earlier result.
#[must_use]
pub fn designate(params: &NameParams, state: &TraversalState) -> TraversalState {
    let mut next = state.clone();
    next.named.insert(params.name.clone(), state.frontier.clone());
    next
}

/// ALT: restore the frontier saved under `name`. Unknown names leave the
/// state as it is.
#[must_use]
pub fn alternate(params: &NameParams, state: &TraversalState) -> TraversalState {
    match state.named.get(&params.name) {
        Some(saved) => state.with_frontier(saved.clone()),
        None => {
            tracing::debug!(name = %params.name, "ALT to unknown name, no-op");
            state.clone()
        }
    }
}

/// INS: add explicit ids and/or a named result to the frontier.
#[must_use]
pub fn insert(params: &InsertParams, state: &TraversalState) -> TraversalState {
    let mut frontier = state.frontier.clone();
    frontier.extend(params.node_ids.iter().cloned());
    if let Some(name) = &params.name {
        if let Some(saved) = state.named.get(name) {
            frontier.extend(saved.iter().cloned());
        }
    }
    state.with_frontier(frontier)
}
