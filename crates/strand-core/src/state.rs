//! # Traversal State
//!
//! The value threaded through a pipeline. Operators take a state by reference
//! and return a new one; nothing here is mutated after it has been handed to
//! the next step.

use crate::index::EdgeRef;
use crate::{NodeId, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PATH
// =============================================================================

/// A walk through the index: `nodes[i]` and `nodes[i + 1]` are joined by
/// `edges[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeRef>,
}

impl Path {
    /// A zero-length path at `origin`.
    #[must_use]
    pub fn start(origin: NodeId) -> Self {
        Self {
            nodes: vec![origin],
            edges: Vec::new(),
        }
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[must_use]
    pub fn origin(&self) -> Option<&NodeId> {
        self.nodes.first()
    }

    #[must_use]
    pub fn terminal(&self) -> Option<&NodeId> {
        self.nodes.last()
    }

    #[must_use]
    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    /// A new path one hop longer. `self` is left untouched.
    #[must_use]
    pub fn extend(&self, edge: EdgeRef, node: NodeId) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        let mut edges = self.edges.clone();
        edges.push(edge);
        Self { nodes, edges }
    }
}

// =============================================================================
// NULLITY
// =============================================================================

/// What the evaluator does once a nullity has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullAction {
    #[default]
    Continue,
    Stop,
    Error,
}

/// Explicit "this came back empty" record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nullity {
    pub reason: String,
    pub action: NullAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
}

// =============================================================================
// TRAVERSAL STATE
// =============================================================================

/// Everything a pipeline has computed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalState {
    /// Current working set of node ids.
    pub frontier: BTreeSet<NodeId>,
    /// Edges traversed so far, in traversal order.
    pub edges: Vec<EdgeRef>,
    /// Paths collected by REC.
    pub paths: Vec<Path>,
    /// Nodes that have been expanded or reached.
    pub visited: BTreeSet<NodeId>,
    /// Hops taken so far.
    pub depth: usize,
    /// Frontiers saved by DES.
    pub named: BTreeMap<String, BTreeSet<NodeId>>,
    /// Scalar results written by SYN.
    pub outputs: BTreeMap<String, PropertyValue>,
    pub nullity: Option<Nullity>,
}

impl TraversalState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A state whose frontier is `nodes`.
    pub fn from_nodes<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self {
            frontier: nodes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// True when the frontier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Copy of this state with a different frontier.
    #[must_use]
    pub fn with_frontier(&self, frontier: BTreeSet<NodeId>) -> Self {
        Self {
            frontier,
            ..self.clone()
        }
    }
}
