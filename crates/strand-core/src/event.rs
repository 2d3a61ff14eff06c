//! # Fact Events
//!
//! The two immutable fact shapes the engine understands: "node created" and
//! "edge created". Events are built here, handed to the log collaborator, and
//! later replayed into the [`EdgeIndex`](crate::index::EdgeIndex).
//!
//! Construction validates required fields so malformed facts never reach the
//! log or the index.

use crate::primitives::FACT_KIND;
use crate::{Edge, EventId, Node, NodeId, Properties, ProvenanceContext, StrandError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// PAYLOADS
// =============================================================================

/// Node payload of a `node_create` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFact {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Edge payload of an `edge_create` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFact {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl EdgeFact {
    pub fn new(
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

/// What a fact event asserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FactPayload {
    NodeCreate {
        node: NodeFact,
    },
    EdgeCreate {
        edge: EdgeFact,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        supersedes: Option<EventId>,
    },
}

// =============================================================================
// FACT EVENT
// =============================================================================

/// An append-only fact with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEvent {
    pub id: EventId,
    pub kind: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub context: ProvenanceContext,
    pub payload: FactPayload,
}

impl FactEvent {
    /// Build a `node_create` event.
    ///
    /// Fails with `MissingField` when `id` or `node_type` is empty and with
    /// `InvalidConfidence` when the context is out of range.
    pub fn node_created(
        node: NodeFact,
        actor: impl Into<String>,
        context: ProvenanceContext,
    ) -> Result<Self, StrandError> {
        let event = Self {
            id: EventId::generate(),
            kind: FACT_KIND.to_string(),
            actor: actor.into(),
            timestamp: Utc::now(),
            context,
            payload: FactPayload::NodeCreate { node },
        };
        event.validate()?;
        Ok(event)
    }

    /// Build an `edge_create` event, optionally superseding an earlier edge
    /// event.
    pub fn edge_created(
        edge: EdgeFact,
        actor: impl Into<String>,
        context: ProvenanceContext,
        supersedes: Option<EventId>,
    ) -> Result<Self, StrandError> {
        let event = Self {
            id: EventId::generate(),
            kind: FACT_KIND.to_string(),
            actor: actor.into(),
            timestamp: Utc::now(),
            context,
            payload: FactPayload::EdgeCreate { edge, supersedes },
        };
        event.validate()?;
        Ok(event)
    }

    /// Override the generated id. Used when replaying facts whose ids are
    /// assigned elsewhere.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = id.into();
        self
    }

    /// Check required fields and provenance.
    pub fn validate(&self) -> Result<(), StrandError> {
        match &self.payload {
            FactPayload::NodeCreate { node } => {
                if node.id.as_str().is_empty() {
                    return Err(StrandError::MissingField {
                        kind: "node",
                        field: "id",
                    });
                }
                if node.node_type.is_empty() {
                    return Err(StrandError::MissingField {
                        kind: "node",
                        field: "type",
                    });
                }
            }
            FactPayload::EdgeCreate { edge, .. } => {
                if edge.from.as_str().is_empty() {
                    return Err(StrandError::MissingField {
                        kind: "edge",
                        field: "from",
                    });
                }
                if edge.to.as_str().is_empty() {
                    return Err(StrandError::MissingField {
                        kind: "edge",
                        field: "to",
                    });
                }
                if edge.edge_type.is_empty() {
                    return Err(StrandError::MissingField {
                        kind: "edge",
                        field: "type",
                    });
                }
            }
        }
        self.context.validate()
    }

    /// The node record this event creates, if it is a node event.
    #[must_use]
    pub fn to_node(&self) -> Option<Node> {
        match &self.payload {
            FactPayload::NodeCreate { node } => Some(Node {
                id: node.id.clone(),
                node_type: node.node_type.clone(),
                properties: node.properties.clone(),
                event_id: Some(self.id.clone()),
            }),
            FactPayload::EdgeCreate { .. } => None,
        }
    }

    /// The edge version this event creates, if it is an edge event.
    ///
    /// `superseded_by` is always empty here; only the index sets it.
    #[must_use]
    pub fn to_edge(&self) -> Option<Edge> {
        match &self.payload {
            FactPayload::EdgeCreate { edge, supersedes } => Some(Edge {
                id: self.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                edge_type: edge.edge_type.clone(),
                properties: edge.properties.clone(),
                context: self.context.clone(),
                supersedes: supersedes.clone(),
                superseded_by: None,
            }),
            FactPayload::NodeCreate { .. } => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node_fact(id: &str, node_type: &str) -> NodeFact {
        NodeFact {
            id: NodeId::new(id),
            node_type: node_type.to_string(),
            properties: Properties::new(),
        }
    }

    #[test]
    fn node_event_requires_id_and_type() {
        let missing_id =
            FactEvent::node_created(node_fact("", "person"), "tester", ProvenanceContext::default());
        assert!(matches!(
            missing_id,
            Err(StrandError::MissingField { field: "id", .. })
        ));

        let missing_type =
            FactEvent::node_created(node_fact("a", ""), "tester", ProvenanceContext::default());
        assert!(matches!(
            missing_type,
            Err(StrandError::MissingField { field: "type", .. })
        ));
    }

    #[test]
    fn edge_event_requires_endpoints_and_type() {
        for (from, to, ty, field) in [
            ("", "b", "knows", "from"),
            ("a", "", "knows", "to"),
            ("a", "b", "", "type"),
        ] {
            let result = FactEvent::edge_created(
                EdgeFact::new(from, to, ty),
                "tester",
                ProvenanceContext::default(),
                None,
            );
            match result {
                Err(StrandError::MissingField { field: f, .. }) => assert_eq!(f, field),
                other => unreachable!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn edge_event_rejects_bad_confidence() {
        let result = FactEvent::edge_created(
            EdgeFact::new("a", "b", "knows"),
            "tester",
            ProvenanceContext::default().with_confidence(-0.1),
            None,
        );
        assert!(matches!(result, Err(StrandError::InvalidConfidence(_))));
    }

    #[test]
    fn wire_shape_matches_fact_format() {
        let event = FactEvent::edge_created(
            EdgeFact::new("a", "b", "knows"),
            "tester",
            ProvenanceContext::from_source("crm"),
            Some(EventId::new("old")),
        )
        .expect("build");

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["kind"], "given");
        assert_eq!(json["payload"]["action"], "edge_create");
        assert_eq!(json["payload"]["edge"]["type"], "knows");
        assert_eq!(json["payload"]["supersedes"], "old");
        assert_eq!(json["context"]["source"], "crm");

        let back: FactEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn edge_conversion_carries_provenance_and_supersession() {
        let event = FactEvent::edge_created(
            EdgeFact::new("a", "b", "knows"),
            "tester",
            ProvenanceContext::from_source("hr").with_confidence(0.4),
            Some(EventId::new("e0")),
        )
        .expect("build");

        let edge = event.to_edge().expect("edge");
        assert_eq!(edge.id, event.id);
        assert_eq!(edge.context.source, "hr");
        assert_eq!(edge.supersedes, Some(EventId::new("e0")));
        assert!(edge.superseded_by.is_none());
        assert!(event.to_node().is_none());
    }
}
