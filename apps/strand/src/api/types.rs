//! # API Request/Response Types
//!
//! JSON bodies accepted and returned by the HTTP API.

use serde::{Deserialize, Serialize};
use strand_core::{
    ConflictSet, ContextOptions, Direction, Edge, EdgeFact, EventId, GraphStats, NodeFact, NodeId,
    PathOptions, Properties, ProvenanceContext, ProvenanceFilter, QueryResult,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATS RESPONSE
// =============================================================================

/// Index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub node_count: usize,
    pub edge_count: usize,
    pub active_edge_count: usize,
    pub superseded_count: usize,
    pub conflicting_keys: usize,
    pub node_types: Vec<String>,
    pub edge_types: Vec<String>,
    pub sources: Vec<String>,
}

impl From<GraphStats> for StatsResponse {
    fn from(stats: GraphStats) -> Self {
        Self {
            active_edge_count: stats.active_edge_count(),
            node_count: stats.node_count,
            edge_count: stats.edge_count,
            superseded_count: stats.superseded_count,
            conflicting_keys: stats.conflicting_keys,
            node_types: stats.node_types,
            edge_types: stats.edge_types,
            sources: stats.sources,
        }
    }
}

// =============================================================================
// FACT REQUESTS
// =============================================================================

/// Body of `POST /nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub context: ProvenanceContext,
    /// Who asserts the fact. The server's configured actor when absent.
    #[serde(default)]
    pub actor: Option<String>,
}

impl NodeRequest {
    /// Split into the fact and its provenance.
    #[must_use]
    pub fn into_parts(self) -> (NodeFact, ProvenanceContext) {
        (
            NodeFact {
                id: self.id,
                node_type: self.node_type,
                properties: self.properties,
            },
            self.context,
        )
    }
}

/// Body of `POST /edges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub context: ProvenanceContext,
    /// Earlier version this edge replaces.
    #[serde(default)]
    pub supersedes: Option<EventId>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl EdgeRequest {
    #[must_use]
    pub fn into_parts(self) -> (EdgeFact, ProvenanceContext, Option<EventId>) {
        (
            EdgeFact::new(self.from, self.to, self.edge_type).with_properties(self.properties),
            self.context,
            self.supersedes,
        )
    }
}

/// Result of recording a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FactResponse {
    #[must_use]
    pub fn success(event_id: EventId) -> Self {
        Self {
            success: true,
            event_id: Some(event_id),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            event_id: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// QUERY REQUESTS
// =============================================================================

/// Body of `POST /execute`: a raw pipeline and its start nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Array of `{op, params}` steps.
    pub pipeline: serde_json::Value,
    #[serde(default)]
    pub start_nodes: Vec<NodeId>,
}

/// Body of `POST /paths`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsRequest {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub edge_types: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub shortest: bool,
    #[serde(default)]
    pub provenance: Option<ProvenanceFilter>,
    #[serde(default)]
    pub active_only: bool,
}

impl PathsRequest {
    #[must_use]
    pub fn options(&self) -> (PathOptions, ContextOptions) {
        (
            PathOptions {
                max_depth: self.max_depth,
                edge_types: self.edge_types.clone(),
                direction: self.direction,
                shortest: self.shortest,
            },
            ContextOptions {
                provenance: self.provenance.clone(),
                active_only: self.active_only,
            },
        )
    }
}

/// Body of `POST /hops`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopsRequest {
    pub start: NodeId,
    pub max_hops: usize,
    #[serde(default)]
    pub edge_types: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub provenance: Option<ProvenanceFilter>,
    #[serde(default)]
    pub active_only: bool,
}

impl HopsRequest {
    #[must_use]
    pub fn options(&self) -> (PathOptions, ContextOptions) {
        (
            PathOptions {
                max_depth: Some(self.max_hops),
                edge_types: self.edge_types.clone(),
                direction: self.direction,
                shortest: false,
            },
            ContextOptions {
                provenance: self.provenance.clone(),
                active_only: self.active_only,
            },
        )
    }
}

/// Outcome of any pipeline-backed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    #[must_use]
    pub fn success(result: QueryResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// INSPECTION RESPONSES
// =============================================================================

/// Every relationship with more than one recorded version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsResponse {
    pub count: usize,
    pub conflicts: Vec<ConflictSet>,
}

/// Versions linked to one edge by supersession, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub id: EventId,
    pub versions: Vec<Edge>,
}

/// Plain error body for lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
