//! NUL: make an empty frontier explicit.

use super::NullifyParams;
use crate::primitives::DEFAULT_NULLITY_REASON;
use crate::state::{Nullity, TraversalState};

/// Attach a nullity record when the frontier is empty. The frontier itself is
/// never changed, and a non-empty state passes through untouched.
#[must_use]
pub fn apply(params: &NullifyParams, state: &TraversalState) -> TraversalState {
    if !state.is_empty() {
        return state.clone();
    }
    TraversalState {
        nullity: Some(Nullity {
            reason: params
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_NULLITY_REASON.to_string()),
            action: params.action,
            default: params.default.clone(),
        }),
        ..state.clone()
    }
}
