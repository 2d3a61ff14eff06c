//! # Graph Engine
//!
//! The façade callers use. It owns one [`EdgeIndex`] behind a read-write
//! lock, turns `add_node` / `add_edge` calls into fact events, runs
//! pipelines, and offers a few canned queries built from the operators.
//!
//! ## Deployment Modes
//!
//! - **Embedded**: no log. Facts are indexed directly.
//! - **Log-backed**: facts are appended to an [`EventLog`]; the engine's
//!   subscription indexes each one after the append succeeds. The index can
//!   be rebuilt from the log at any time.
//!
//! ## Concurrency
//!
//! Pipelines hold a read guard for their whole run. Incremental indexing takes
//! a short write guard. A rebuild constructs the new index without holding the
//! lock and swaps it in under the write guard.

use crate::config::EngineConfig;
use crate::event::{EdgeFact, FactEvent, NodeFact};
use crate::index::{Direction, EdgeIndex, ProvenanceFilter};
use crate::log::{EventLog, Subscription};
use crate::ops::{
    CollectMode, ConnectParams, RecurseParams, SelectParams, Step, SuperposeMode, SuperposeParams,
};
use crate::pipeline::Pipeline;
use crate::state::{Nullity, Path, TraversalState};
use crate::stats::GraphStats;
use crate::{Edge, EdgeKey, EventId, Node, NodeId, PropertyValue, ProvenanceContext, StrandError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Actor recorded on facts when none is configured.
const DEFAULT_ACTOR: &str = "strand";

// =============================================================================
// OPTIONS
// =============================================================================

/// Inputs to [`GraphEngine::execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteOptions {
    /// Initial frontier.
    pub start_nodes: Vec<NodeId>,
}

impl ExecuteOptions {
    pub fn starting_at<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self {
            start_nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Options shared by the path-finding and neighbourhood queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Hop limit. Defaults to `EngineConfig::default_path_depth`.
    pub max_depth: Option<usize>,
    /// Edge type allow-list (empty = all).
    pub edge_types: Vec<String>,
    pub direction: Direction,
    /// Keep only the shortest path found.
    pub shortest: bool,
}

/// Provenance constraints for [`GraphEngine::find_paths_with_context`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    pub provenance: Option<ProvenanceFilter>,
    /// Ignore superseded edge versions.
    pub active_only: bool,
}

// =============================================================================
// RESULTS
// =============================================================================

/// A collected path with its nodes resolved against the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedPath {
    pub node_ids: Vec<NodeId>,
    /// Node records for the ids that have one, in path order.
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub length: usize,
}

impl FormattedPath {
    fn from_path(path: &Path, index: &EdgeIndex) -> Self {
        Self {
            node_ids: path.nodes.clone(),
            nodes: path
                .nodes
                .iter()
                .filter_map(|id| index.node(id).cloned())
                .collect(),
            edges: path.edges.iter().map(|e| Edge::clone(e)).collect(),
            length: path.len(),
        }
    }
}

/// The formatted outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Node records for frontier ids that have one.
    pub nodes: Vec<Node>,
    /// Final frontier, sorted.
    pub node_ids: Vec<NodeId>,
    pub edges: Vec<Edge>,
    pub paths: Vec<FormattedPath>,
    pub depth: usize,
    pub named: BTreeMap<String, Vec<NodeId>>,
    pub outputs: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullity: Option<Nullity>,
}

impl QueryResult {
    /// Format `state` against `index`.
    #[must_use]
    pub fn from_state(state: &TraversalState, index: &EdgeIndex) -> Self {
        Self {
            nodes: state
                .frontier
                .iter()
                .filter_map(|id| index.node(id).cloned())
                .collect(),
            node_ids: state.frontier.iter().cloned().collect(),
            edges: state.edges.iter().map(|e| Edge::clone(e)).collect(),
            paths: state
                .paths
                .iter()
                .map(|p| FormattedPath::from_path(p, index))
                .collect(),
            depth: state.depth,
            named: state
                .named
                .iter()
                .map(|(name, ids)| (name.clone(), ids.iter().cloned().collect()))
                .collect(),
            outputs: state.outputs.clone(),
            nullity: state.nullity.clone(),
        }
    }
}

/// All versions recorded for one contested relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictSet {
    pub key: EdgeKey,
    /// Every version in arrival order.
    pub versions: Vec<Edge>,
}

// =============================================================================
// GRAPH ENGINE
// =============================================================================

/// The query engine.
pub struct GraphEngine {
    index: Arc<RwLock<EdgeIndex>>,
    log: Option<Arc<dyn EventLog>>,
    /// Keeps the index subscribed to `log`. Dropped with the engine.
    _subscription: Option<Subscription>,
    config: EngineConfig,
    actor: String,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.read();
        f.debug_struct("GraphEngine")
            .field("nodes", &index.node_count())
            .field("edges", &index.edge_count())
            .field("log", &self.log.is_some())
            .field("config", &self.config)
            .field("actor", &self.actor)
            .finish()
    }
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine {
    /// An embedded engine with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: Arc::new(RwLock::new(EdgeIndex::new())),
            log: None,
            _subscription: None,
            config: EngineConfig::default(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// An embedded engine with custom limits.
    pub fn with_config(config: EngineConfig) -> Result<Self, StrandError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// A log-backed engine. The index is built from everything already in
    /// `log` and kept current through a subscription.
    pub fn with_log(log: Arc<dyn EventLog>, config: EngineConfig) -> Result<Self, StrandError> {
        config.validate()?;
        let index = Arc::new(RwLock::new(EdgeIndex::new()));

        let sink = Arc::clone(&index);
        let subscription = Subscription::attach(
            &log,
            Arc::new(move |event: &FactEvent| {
                sink.write().apply(event);
            }),
        );

        let engine = Self {
            index,
            log: Some(log),
            _subscription: Some(subscription),
            config,
            actor: DEFAULT_ACTOR.to_string(),
        };
        engine.rebuild()?;
        Ok(engine)
    }

    /// Actor name recorded on facts created through this engine.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Record a node fact asserted by `actor` (the engine's actor when
    /// `None`). Returns the id of the created event.
    pub fn add_node(
        &self,
        node: NodeFact,
        actor: Option<&str>,
        context: ProvenanceContext,
    ) -> Result<EventId, StrandError> {
        let event = FactEvent::node_created(node, self.actor_or(actor), context)?;
        self.ingest(event, "add_node")
    }

    /// Record an edge fact, optionally superseding an earlier edge version.
    /// Returns the id of the created event, which is also the edge id.
    pub fn add_edge(
        &self,
        edge: EdgeFact,
        actor: Option<&str>,
        context: ProvenanceContext,
        supersedes: Option<EventId>,
    ) -> Result<EventId, StrandError> {
        let event = FactEvent::edge_created(edge, self.actor_or(actor), context, supersedes)?;
        self.ingest(event, "add_edge")
    }

    fn actor_or<'a>(&'a self, actor: Option<&'a str>) -> &'a str {
        match actor.map(str::trim) {
            Some(actor) if !actor.is_empty() => actor,
            _ => self.actor.as_str(),
        }
    }

    /// Record an already built event (e.g. one replayed from elsewhere).
    pub fn ingest_event(&self, event: FactEvent) -> Result<EventId, StrandError> {
        event.validate()?;
        self.ingest(event, "ingest_event")
    }

    fn ingest(&self, event: FactEvent, operation: &str) -> Result<EventId, StrandError> {
        let id = event.id.clone();
        match &self.log {
            Some(log) => log.append(event).map_err(|e| {
                let reason = match e {
                    StrandError::Ingestion { reason, .. } => reason,
                    other => other.to_string(),
                };
                tracing::warn!(operation, %reason, "log rejected fact");
                StrandError::Ingestion {
                    operation: operation.to_string(),
                    reason,
                }
            })?,
            None => {
                self.index.write().apply(&event);
            }
        }
        tracing::debug!(operation, event = %id, "fact recorded");
        Ok(id)
    }

    /// Rebuild the index from the log. Returns the number of events
    /// replayed. Without a log the index is left as it is.
    pub fn rebuild(&self) -> Result<usize, StrandError> {
        let Some(log) = &self.log else {
            tracing::warn!("rebuild requested without an event log, index unchanged");
            return Ok(0);
        };

        let events = log.get_all()?;
        let mut fresh = EdgeIndex::from_events(&events);

        let mut guard = self.index.write();
        // Pick up anything appended while the fresh index was being built.
        let latest = log.get_all()?;
        for event in latest.iter().skip(events.len()) {
            fresh.apply(event);
        }
        *guard = fresh;
        drop(guard);

        tracing::info!(events = latest.len(), "index rebuilt");
        Ok(latest.len())
    }

    /// Replace the index with one built from `events`.
    pub fn rebuild_from(&self, events: &[FactEvent]) {
        let fresh = EdgeIndex::from_events(events);
        *self.index.write() = fresh;
        tracing::info!(events = events.len(), "index rebuilt from events");
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Validate `steps` against this engine's limits.
    pub fn pipeline(&self, steps: Vec<Step>) -> Result<Pipeline, StrandError> {
        Pipeline::with_config(steps, &self.config)
    }

    /// Parse and validate a JSON pipeline against this engine's limits.
    pub fn parse_pipeline(&self, value: serde_json::Value) -> Result<Pipeline, StrandError> {
        Pipeline::from_value(value, &self.config)
    }

    /// Run `pipeline` from `options.start_nodes`.
    pub fn execute(
        &self,
        pipeline: &Pipeline,
        options: ExecuteOptions,
    ) -> Result<QueryResult, StrandError> {
        let index = self.index.read();
        let state = pipeline.run(TraversalState::from_nodes(options.start_nodes), &index)?;
        Ok(QueryResult::from_state(&state, &index))
    }

    /// Paths from `from` to `to`: SEG, REC with a target, optionally SUP.
    pub fn find_paths(
        &self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        options: PathOptions,
    ) -> Result<QueryResult, StrandError> {
        self.find_paths_with_context(from, to, options, ContextOptions::default())
    }

    /// [`find_paths`](Self::find_paths) restricted by provenance.
    pub fn find_paths_with_context(
        &self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        options: PathOptions,
        context: ContextOptions,
    ) -> Result<QueryResult, StrandError> {
        let hop = ConnectParams::new(options.direction)
            .edge_types(options.edge_types)
            .provenance(context.provenance)
            .active_only(context.active_only);
        let rec = RecurseParams::new(hop)
            .max_depth(options.max_depth.unwrap_or(self.config.default_path_depth))
            .target(to)
            .collect(CollectMode::Paths);

        let mut steps = vec![
            Step::Select(SelectParams::node(from)),
            Step::Recurse(rec),
        ];
        if options.shortest {
            steps.push(Step::Superpose(SuperposeParams {
                mode: SuperposeMode::Shortest,
            }));
        }
        let pipeline = self.pipeline(steps)?;
        self.execute(&pipeline, ExecuteOptions::default())
    }

    /// Every node reachable from `start` within `max_hops`.
    pub fn find_within_hops(
        &self,
        start: impl Into<NodeId>,
        max_hops: usize,
        options: PathOptions,
        context: ContextOptions,
    ) -> Result<QueryResult, StrandError> {
        let hop = ConnectParams::new(options.direction)
            .edge_types(options.edge_types)
            .provenance(context.provenance)
            .active_only(context.active_only);
        let rec = RecurseParams::new(hop)
            .max_depth(max_hops)
            .collect(CollectMode::Nodes);

        let pipeline = self.pipeline(vec![
            Step::Select(SelectParams::node(start)),
            Step::Recurse(rec),
        ])?;
        self.execute(&pipeline, ExecuteOptions::default())
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    #[must_use]
    pub fn get_stats(&self) -> GraphStats {
        GraphStats::from_index(&self.index.read())
    }

    /// Relationships with more than one recorded version.
    #[must_use]
    pub fn get_conflicting_edges(&self) -> Vec<ConflictSet> {
        self.index
            .read()
            .conflicting_keys()
            .map(|(key, versions)| ConflictSet {
                key: key.clone(),
                versions: versions.iter().map(|e| Edge::clone(e)).collect(),
            })
            .collect()
    }

    /// Oldest-to-newest versions in the chain through `id`.
    #[must_use]
    pub fn get_supersession_chain(&self, id: &EventId) -> Vec<Edge> {
        self.index
            .read()
            .get_supersession_chain(id)
            .iter()
            .map(|e| Edge::clone(e))
            .collect()
    }

    /// Every version between two nodes, optionally of one type.
    #[must_use]
    pub fn get_edge_versions(&self, from: &NodeId, to: &NodeId, edge_type: Option<&str>) -> Vec<Edge> {
        self.index
            .read()
            .get_edge_versions(from, to, edge_type)
            .iter()
            .map(|e| Edge::clone(e))
            .collect()
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.index.read().node(id).cloned()
    }

    #[must_use]
    pub fn edge(&self, id: &EventId) -> Option<Edge> {
        self.index.read().edge(id).map(|e| Edge::clone(e))
    }
}

// =============================================================================
// TESTS
// =============================================================================
