//! # Core Type Definitions
//!
//! This module contains the data model shared by every layer of the engine:
//! - Identifiers (`NodeId`, `EventId`)
//! - Graph records (`Node`, `Edge`) and their provenance (`ProvenanceContext`)
//! - Property values and filters (`PropertyValue`, `PropertyFilter`)
//! - Error types (`StrandError`)
//!
//! ## Ordering Guarantees
//!
//! Identifiers implement `Ord` so every index in the engine can be a
//! `BTreeMap`/`BTreeSet`, which keeps query output deterministic.

mod value;

pub use value::{CompareOp, Properties, PropertyFilter, PropertyValue};

use crate::primitives::{DEFAULT_CONFIDENCE, DEFAULT_SOURCE, DEFAULT_WORKSPACE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a node. Caller-chosen and unique across the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a fact event. An indexed edge reuses the id of the event
/// that created it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Where a fact came from and how much it is trusted.
///
/// Attached once when the fact is created and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceContext {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_source")]
    pub source: String,
    /// Confidence in `[0.0, 1.0]`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_date: Option<DateTime<Utc>>,
}

fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl Default for ProvenanceContext {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            source: default_source(),
            confidence: DEFAULT_CONFIDENCE,
            document_ref: None,
            observed_date: None,
        }
    }
}

impl ProvenanceContext {
    /// Context attributed to `source` with full confidence.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_document(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    #[must_use]
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_date = Some(at);
        self
    }

    /// Reject confidences outside `[0, 1]` (and NaN).
    pub fn validate(&self) -> Result<(), StrandError> {
        if (0.0..=1.0).contains(&self.confidence) {
            Ok(())
        } else {
            Err(StrandError::InvalidConfidence(self.confidence))
        }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A node record as held by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Properties,
    /// The event that created this version of the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: Properties::new(),
            event_id: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Key under which competing versions of one relationship are grouped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
}

/// One indexed version of a relationship.
///
/// The id is the id of the creating event. Apart from `superseded_by`, which
/// the index fills in once a newer version arrives, an edge never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EventId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub context: ProvenanceContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<EventId>,
}

impl Edge {
    pub fn new(
        id: impl Into<EventId>,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
            properties: Properties::new(),
            context: ProvenanceContext::default(),
            supersedes: None,
            superseded_by: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: ProvenanceContext) -> Self {
        self.context = context;
        self
    }

    /// True once a newer version of this edge has been indexed.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }

    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from.clone(),
            to: self.to.clone(),
            edge_type: self.edge_type.clone(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Strand engine.
///
/// Pipelines never write to the index, so none of these leave it
/// inconsistent.
#[derive(Debug, Error)]
pub enum StrandError {
    /// A fact was built without one of its required fields.
    #[error("Missing required field `{field}` for {kind}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    /// Provenance confidence outside `[0, 1]`.
    #[error("Invalid confidence {0}: expected a value in [0, 1]")]
    InvalidConfidence(f64),

    /// The event log refused an append.
    #[error("Ingestion failed in {operation}: {reason}")]
    Ingestion { operation: String, reason: String },

    /// A NUL step with action `error` fired.
    #[error("Pipeline produced no result: {reason}")]
    Nullity { reason: String },

    /// The pipeline failed validation before running.
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for StrandError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
