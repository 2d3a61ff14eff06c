//! # Edge Index
//!
//! The derived, rebuildable, read-only view over all fact events.
//!
//! Edges live in an insertion-ordered arena; every other structure refers to
//! them by slot. Supersession links are plain event ids, so the only in-place
//! change an edge ever sees is its `superseded_by` pointer being set. Edges are
//! shared as `Arc<Edge>` and that pointer is written copy-on-write, so
//! traversal states holding an older `Arc` are never affected.
//!
//! All maps are `BTreeMap`/`BTreeSet` for deterministic iteration.

use crate::event::FactEvent;
use crate::{Edge, EdgeKey, EventId, Node, NodeId, StrandError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Shared handle to an indexed edge version.
pub type EdgeRef = Arc<Edge>;

/// Arbitrary predicate over an edge, used by `traverse`.
pub type EdgePredicate = Arc<dyn Fn(&Edge) -> bool + Send + Sync>;

// =============================================================================
// TRAVERSAL OPTIONS
// =============================================================================

/// Which incident edges of a node to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    #[serde(alias = "out")]
    Outgoing,
    #[serde(alias = "in")]
    Incoming,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "out" | "outgoing" => Ok(Self::Outgoing),
            "in" | "incoming" => Ok(Self::Incoming),
            "both" => Ok(Self::Both),
            other => Err(StrandError::InvalidPipeline(format!(
                "unknown direction: {other}"
            ))),
        }
    }
}

/// Predicate over an edge's provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvenanceFilter {
    /// Keep edges with `confidence >= min_confidence`.
    pub min_confidence: Option<f64>,
    /// Keep edges with `confidence <= max_confidence`.
    pub max_confidence: Option<f64>,
    /// Keep edges whose source is in this list (empty = any source).
    pub sources: Vec<String>,
    /// Keep edges citing exactly this document.
    pub document_ref: Option<String>,
    /// Drop edges that have been superseded.
    pub exclude_superseded: bool,
}

impl ProvenanceFilter {
    #[must_use]
    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    #[must_use]
    pub fn max_confidence(mut self, max: f64) -> Self {
        self.max_confidence = Some(max);
        self
    }

    #[must_use]
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn document(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }

    #[must_use]
    pub fn exclude_superseded(mut self) -> Self {
        self.exclude_superseded = true;
        self
    }

    #[must_use]
    pub fn matches(&self, edge: &Edge) -> bool {
        let ctx = &edge.context;
        if self.min_confidence.is_some_and(|min| ctx.confidence < min) {
            return false;
        }
        if self.max_confidence.is_some_and(|max| ctx.confidence > max) {
            return false;
        }
        if !self.sources.is_empty() && !self.sources.iter().any(|s| *s == ctx.source) {
            return false;
        }
        if let Some(doc) = &self.document_ref {
            if ctx.document_ref.as_deref() != Some(doc.as_str()) {
                return false;
            }
        }
        !(self.exclude_superseded && edge.is_superseded())
    }
}

/// Options for [`EdgeIndex::traverse`].
#[derive(Clone, Default)]
pub struct TraverseOptions {
    pub direction: Direction,
    /// Allowed edge types (empty = all types).
    pub edge_types: Vec<String>,
    pub edge_filter: Option<EdgePredicate>,
    pub provenance: Option<ProvenanceFilter>,
    /// Shortcut for "exclude superseded".
    pub active_only: bool,
}

impl std::fmt::Debug for TraverseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraverseOptions")
            .field("direction", &self.direction)
            .field("edge_types", &self.edge_types)
            .field("edge_filter", &self.edge_filter.is_some())
            .field("provenance", &self.provenance)
            .field("active_only", &self.active_only)
            .finish()
    }
}

impl TraverseOptions {
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn edge_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&Edge) -> bool + Send + Sync + 'static) -> Self {
        self.edge_filter = Some(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn provenance(mut self, filter: ProvenanceFilter) -> Self {
        self.provenance = Some(filter);
        self
    }

    #[must_use]
    pub fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    fn accepts(&self, edge: &Edge) -> bool {
        if !self.edge_types.is_empty() && !self.edge_types.iter().any(|t| *t == edge.edge_type) {
            return false;
        }
        if self.active_only && edge.is_superseded() {
            return false;
        }
        if let Some(provenance) = &self.provenance {
            if !provenance.matches(edge) {
                return false;
            }
        }
        self.edge_filter.as_ref().is_none_or(|predicate| predicate(edge))
    }
}

// =============================================================================
// EDGE INDEX
// =============================================================================

/// Adjacency, provenance and supersession indexes over every fact seen.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    /// Node records, last write wins.
    nodes: BTreeMap<NodeId, Node>,
    nodes_by_type: BTreeMap<String, BTreeSet<NodeId>>,

    /// Edge arena in arrival order. Slots are stable for the life of the index.
    edges: Vec<EdgeRef>,
    slots: BTreeMap<EventId, usize>,

    outgoing: BTreeMap<NodeId, Vec<usize>>,
    incoming: BTreeMap<NodeId, Vec<usize>>,
    by_type: BTreeMap<String, Vec<usize>>,
    by_source: BTreeMap<String, Vec<usize>>,
    by_document: BTreeMap<String, Vec<usize>>,

    /// Every version per (from, to, type) and per (from, to).
    versions: BTreeMap<EdgeKey, Vec<usize>>,
    pair_versions: BTreeMap<(NodeId, NodeId), Vec<usize>>,

    /// old version -> version that replaced it
    supersession: BTreeMap<EventId, EventId>,
    /// Supersession links whose old version has not been indexed yet.
    pending_supersession: BTreeMap<EventId, EventId>,
}

impl EdgeIndex {
    /// Create a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index from a full, ordered event list.
    #[must_use]
    pub fn from_events(events: &[FactEvent]) -> Self {
        let mut index = Self::new();
        for event in events {
            index.apply(event);
        }
        index
    }

    /// Clear and re-index from a full, ordered event list.
    pub fn rebuild(&mut self, events: &[FactEvent]) {
        *self = Self::from_events(events);
    }

    /// Index one fact event. Returns `false` when the event was already
    /// indexed.
    pub fn apply(&mut self, event: &FactEvent) -> bool {
        if let Some(node) = event.to_node() {
            self.index_node(node);
            return true;
        }
        match event.to_edge() {
            Some(edge) => self.index_edge(edge),
            None => false,
        }
    }

    /// Insert or overwrite a node record.
    pub fn index_node(&mut self, node: Node) {
        if let Some(previous) = self.nodes.get(&node.id) {
            if previous.node_type != node.node_type {
                if let Some(ids) = self.nodes_by_type.get_mut(&previous.node_type) {
                    ids.remove(&node.id);
                    if ids.is_empty() {
                        self.nodes_by_type.remove(&previous.node_type);
                    }
                }
            }
        }
        self.nodes_by_type
            .entry(node.node_type.clone())
            .or_default()
            .insert(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Add one edge version.
    ///
    /// The version is appended to every adjacency, provenance and version
    /// list. If it supersedes an indexed version, that version's
    /// `superseded_by` is set; if the superseded version has not arrived yet
    /// the link is parked until it does. Re-indexing a known id is a no-op.
    pub fn index_edge(&mut self, mut edge: Edge) -> bool {
        if self.slots.contains_key(&edge.id) {
            tracing::debug!(edge = %edge.id, "edge already indexed, skipping");
            return false;
        }

        edge.superseded_by = self.pending_supersession.remove(&edge.id);
        if let Some(newer) = &edge.superseded_by {
            self.supersession.insert(edge.id.clone(), newer.clone());
        }

        if let Some(old_id) = edge.supersedes.clone() {
            match self.slots.get(&old_id).copied() {
                Some(old_slot) => {
                    if let Some(old) = self.edges.get_mut(old_slot) {
                        Arc::make_mut(old).superseded_by = Some(edge.id.clone());
                    }
                    self.supersession.insert(old_id, edge.id.clone());
                }
                None => {
                    tracing::debug!(
                        edge = %edge.id,
                        supersedes = %old_id,
                        "superseded edge not indexed yet, parking link"
                    );
                    self.pending_supersession.insert(old_id, edge.id.clone());
                }
            }
        }

        let slot = self.edges.len();
        self.slots.insert(edge.id.clone(), slot);
        self.outgoing.entry(edge.from.clone()).or_default().push(slot);
        self.incoming.entry(edge.to.clone()).or_default().push(slot);
        self.by_type
            .entry(edge.edge_type.clone())
            .or_default()
            .push(slot);
        self.by_source
            .entry(edge.context.source.clone())
            .or_default()
            .push(slot);
        if let Some(doc) = &edge.context.document_ref {
            self.by_document.entry(doc.clone()).or_default().push(slot);
        }
        self.versions.entry(edge.key()).or_default().push(slot);
        self.pair_versions
            .entry((edge.from.clone(), edge.to.clone()))
            .or_default()
            .push(slot);

        self.edges.push(Arc::new(edge));
        true
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All node records, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ids of nodes with the given type, ordered by id.
    pub fn nodes_of_type(&self, node_type: &str) -> impl Iterator<Item = &NodeId> {
        self.nodes_by_type
            .get(node_type)
            .into_iter()
            .flat_map(|ids| ids.iter())
    }

    #[must_use]
    pub fn edge(&self, id: &EventId) -> Option<&EdgeRef> {
        self.slots.get(id).and_then(|&slot| self.edges.get(slot))
    }

    /// All edge versions in arrival order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeRef> {
        self.edges.iter()
    }

    pub fn edges_of_type(&self, edge_type: &str) -> Vec<EdgeRef> {
        self.resolve(self.by_type.get(edge_type))
    }

    pub fn edges_by_source(&self, source: &str) -> Vec<EdgeRef> {
        self.resolve(self.by_source.get(source))
    }

    pub fn edges_by_document(&self, document_ref: &str) -> Vec<EdgeRef> {
        self.resolve(self.by_document.get(document_ref))
    }

    fn resolve(&self, slots: Option<&Vec<usize>>) -> Vec<EdgeRef> {
        slots
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.edges.get(slot).cloned())
            .collect()
    }

    // =========================================================================
    // TRAVERSAL
    // =========================================================================

    /// Edges incident to `node` that pass `options`, in arrival order.
    ///
    /// With `Direction::Both` a self-loop is returned once.
    pub fn traverse(&self, node: &NodeId, options: &TraverseOptions) -> Vec<EdgeRef> {
        let empty = Vec::new();
        let out = self.outgoing.get(node).unwrap_or(&empty);
        let inc = self.incoming.get(node).unwrap_or(&empty);

        let slots: Vec<usize> = match options.direction {
            Direction::Outgoing => out.clone(),
            Direction::Incoming => inc.clone(),
            Direction::Both => {
                let merged: BTreeSet<usize> = out.iter().chain(inc.iter()).copied().collect();
                merged.into_iter().collect()
            }
        };

        slots
            .into_iter()
            .filter_map(|slot| self.edges.get(slot))
            .filter(|edge| options.accepts(edge))
            .cloned()
            .collect()
    }

    /// The endpoint of `edge` that is not `from`.
    ///
    /// Returns `None` when `from` is not an endpoint of `edge`.
    #[must_use]
    pub fn get_other_end<'e>(edge: &'e Edge, from: &NodeId) -> Option<&'e NodeId> {
        if edge.from == *from {
            Some(&edge.to)
        } else if edge.to == *from {
            Some(&edge.from)
        } else {
            None
        }
    }

    // =========================================================================
    // VERSIONS & SUPERSESSION
    // =========================================================================

    /// Every version between `from` and `to` (optionally of one type), in
    /// arrival order.
    pub fn get_edge_versions(
        &self,
        from: &NodeId,
        to: &NodeId,
        edge_type: Option<&str>,
    ) -> Vec<EdgeRef> {
        match edge_type {
            Some(edge_type) => {
                let key = EdgeKey {
                    from: from.clone(),
                    to: to.clone(),
                    edge_type: edge_type.to_string(),
                };
                self.resolve(self.versions.get(&key))
            }
            None => self.resolve(self.pair_versions.get(&(from.clone(), to.clone()))),
        }
    }

    /// The supersession chain through `id`, oldest first.
    ///
    /// Empty when `id` is not indexed. Links to versions that were never
    /// indexed end the walk.
    pub fn get_supersession_chain(&self, id: &EventId) -> Vec<EdgeRef> {
        let Some(start) = self.edge(id) else {
            return Vec::new();
        };

        let mut seen: BTreeSet<EventId> = BTreeSet::new();
        seen.insert(start.id.clone());

        let mut older = Vec::new();
        let mut cursor = start.supersedes.clone();
        while let Some(prev_id) = cursor {
            let Some(prev) = self.edge(&prev_id) else {
                break;
            };
            if !seen.insert(prev_id) {
                break;
            }
            cursor = prev.supersedes.clone();
            older.push(Arc::clone(prev));
        }
        older.reverse();

        let mut chain = older;
        chain.push(Arc::clone(start));

        let mut cursor = self.supersession.get(id).cloned();
        while let Some(next_id) = cursor {
            let Some(next) = self.edge(&next_id) else {
                break;
            };
            if !seen.insert(next_id.clone()) {
                break;
            }
            cursor = self.supersession.get(&next_id).cloned();
            chain.push(Arc::clone(next));
        }
        chain
    }

    /// Keys with more than one indexed version, with those versions.
    pub fn conflicting_keys(&self) -> impl Iterator<Item = (&EdgeKey, Vec<EdgeRef>)> {
        self.versions
            .iter()
            .filter(|(_, slots)| slots.len() > 1)
            .map(|(key, slots)| (key, self.resolve(Some(slots))))
    }

    // =========================================================================
    // COUNTS
    // =========================================================================

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.nodes_by_type.keys().map(String::as_str)
    }

    pub fn edge_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.by_source.keys().map(String::as_str)
    }

    #[must_use]
    pub fn conflicting_key_count(&self) -> usize {
        self.versions.values().filter(|slots| slots.len() > 1).count()
    }

    #[must_use]
    pub fn superseded_count(&self) -> usize {
        self.supersession.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
