//! # Validation Tier Tests (T0-T4)
//!
//! End-to-end scenarios over the public engine surface.
//!
//! ## Tiers
//! - T0: Fact Integrity
//! - T1: Index Structure
//! - T2: Single-Hop Operators
//! - T3: Recursive Traversal
//! - T4: Engine Guarantees

use std::collections::BTreeSet;
use std::sync::Arc;
use strand_core::{
    EdgeFact, EngineConfig, EventLog, ExecuteOptions, FactEvent, GraphEngine, MemoryLog, NodeFact,
    NodeId, PathOptions, Properties, PropertyValue, ProvenanceContext, StrandError,
};

fn node(id: &str, node_type: &str) -> NodeFact {
    NodeFact {
        id: id.into(),
        node_type: node_type.to_string(),
        properties: Properties::new(),
    }
}

fn edge(engine: &GraphEngine, from: &str, to: &str, edge_type: &str) -> strand_core::EventId {
    engine
        .add_edge(EdgeFact::new(from, to, edge_type), None, ProvenanceContext::default(), None)
        .expect("add edge")
}

/// a -> b -> c -> a, all `knows`.
fn abc_cycle() -> GraphEngine {
    let engine = GraphEngine::new();
    for id in ["a", "b", "c"] {
        engine
            .add_node(node(id, "person"), None, ProvenanceContext::default())
            .expect("add node");
    }
    edge(&engine, "a", "b", "knows");
    edge(&engine, "b", "c", "knows");
    edge(&engine, "c", "a", "knows");
    engine
}

// =============================================================================
// TIER T0: FACT INTEGRITY
// =============================================================================

mod t0_fact_integrity {
    use super::*;

    /// T0.1: Edges without endpoints or type are rejected before indexing.
    #[test]
    fn incomplete_edges_rejected() {
        let engine = GraphEngine::new();
        for (from, to, ty) in [("", "b", "r"), ("a", "", "r"), ("a", "b", "")] {
            let result =
                engine.add_edge(EdgeFact::new(from, to, ty), None, ProvenanceContext::default(), None);
            assert!(matches!(result, Err(StrandError::MissingField { .. })));
        }
        assert_eq!(engine.get_stats().edge_count, 0);
    }

    /// T0.2: Nodes without id or type are rejected.
    #[test]
    fn incomplete_nodes_rejected() {
        let engine = GraphEngine::new();
        assert!(engine.add_node(node("", "person"), None, ProvenanceContext::default()).is_err());
        assert!(engine.add_node(node("a", ""), None, ProvenanceContext::default()).is_err());
        assert_eq!(engine.get_stats().node_count, 0);
    }

    /// T0.3: Confidence outside [0, 1] is rejected.
    #[test]
    fn out_of_range_confidence_rejected() {
        let engine = GraphEngine::new();
        let result = engine.add_edge(
            EdgeFact::new("a", "b", "r"),
            None,
            ProvenanceContext::from_source("x").with_confidence(2.0),
            None,
        );
        assert!(matches!(result, Err(StrandError::InvalidConfidence(_))));
    }

    /// T0.4: Node re-creation overwrites (last write wins).
    #[test]
    fn node_last_write_wins() {
        let engine = GraphEngine::new();
        engine
            .add_node(node("n", "draft"), None, ProvenanceContext::default())
            .expect("first");
        engine
            .add_node(node("n", "final"), None, ProvenanceContext::default())
            .expect("second");
        let stats = engine.get_stats();
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.node_types, vec!["final"]);
    }
}

// =============================================================================
// TIER T1: INDEX STRUCTURE
// =============================================================================

mod t1_index_structure {
    use super::*;
    use strand_core::{Direction, EdgeIndex, TraverseOptions};

    /// T1.1: An edge appears outgoing from its origin and incoming to its
    /// destination, and each end resolves to the other.
    #[test]
    fn index_symmetry() {
        let engine = abc_cycle();
        let id = edge(&engine, "a", "z", "likes");
        let stored = engine.edge(&id).expect("edge");

        let mut index = EdgeIndex::new();
        index.index_edge(stored.clone());
        let out = index.traverse(&"a".into(), &TraverseOptions::new(Direction::Outgoing));
        let inc = index.traverse(&"z".into(), &TraverseOptions::new(Direction::Incoming));
        assert_eq!(out.len(), 1);
        assert_eq!(inc.len(), 1);
        assert_eq!(out[0].id, id);
        assert_eq!(
            EdgeIndex::get_other_end(&stored, &"a".into()),
            Some(&NodeId::from("z"))
        );
        assert_eq!(
            EdgeIndex::get_other_end(&stored, &"z".into()),
            Some(&NodeId::from("a"))
        );
        assert_eq!(EdgeIndex::get_other_end(&stored, &"q".into()), None);
    }

    /// T1.2: Conflicting claims keep every version and are reported.
    #[test]
    fn conflicting_edges_kept() {
        let engine = GraphEngine::new();
        engine
            .add_edge(
                EdgeFact::new("p", "acme", "employed_by"),
                None,
                ProvenanceContext::from_source("hr").with_confidence(0.9),
                None,
            )
            .expect("hr");
        engine
            .add_edge(
                EdgeFact::new("p", "acme", "employed_by"),
                None,
                ProvenanceContext::from_source("linkedin").with_confidence(0.4),
                None,
            )
            .expect("linkedin");

        let versions = engine.get_edge_versions(&"p".into(), &"acme".into(), Some("employed_by"));
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].context.source, "hr");
        assert_eq!(versions[1].context.source, "linkedin");

        let conflicts = engine.get_conflicting_edges();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].versions.len(), 2);
        assert_eq!(engine.get_stats().conflicting_keys, 1);
    }

    /// T1.3: Supersession chains are closed: every member reports the same
    /// chain, oldest first.
    #[test]
    fn supersession_closure() {
        let engine = GraphEngine::new();
        let v1 = edge(&engine, "p", "o", "role");
        let v2 = engine
            .add_edge(EdgeFact::new("p", "o", "role"), None, ProvenanceContext::default(), Some(v1.clone()))
            .expect("v2");
        let v3 = engine
            .add_edge(EdgeFact::new("p", "o", "role"), None, ProvenanceContext::default(), Some(v2.clone()))
            .expect("v3");

        let expected = vec![v1.clone(), v2.clone(), v3.clone()];
        for id in [&v1, &v2, &v3] {
            let chain: Vec<_> = engine
                .get_supersession_chain(id)
                .into_iter()
                .map(|e| e.id)
                .collect();
            assert_eq!(chain, expected);
        }
        assert_eq!(engine.edge(&v1).and_then(|e| e.superseded_by), Some(v2.clone()));
        assert_eq!(engine.edge(&v2).and_then(|e| e.superseded_by), Some(v3));
        assert!(engine.get_supersession_chain(&"unknown".into()).is_empty());
    }
}

// =============================================================================
// TIER T2: SINGLE-HOP OPERATORS
// =============================================================================

mod t2_single_hop {
    use super::*;

    /// T2.1: SEG by type over an empty frontier returns exactly that type.
    #[test]
    fn seg_type_filter_scenario() {
        let engine = GraphEngine::new();
        engine
            .add_node(node("alice", "person"), None, ProvenanceContext::default())
            .expect("add");
        engine
            .add_node(node("bob", "person"), None, ProvenanceContext::default())
            .expect("add");
        engine
            .add_node(node("k1", "contract"), None, ProvenanceContext::default())
            .expect("add");

        let pipeline = engine
            .parse_pipeline(serde_json::json!([{"op": "SEG", "params": {"type": "person"}}]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::default())
            .expect("execute");

        let ids: BTreeSet<&str> = result.node_ids.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, BTreeSet::from(["alice", "bob"]));
        assert!(result.nodes.iter().all(|n| n.node_type == "person"));
    }

    /// T2.2: CON follows direction and type, and records edges.
    #[test]
    fn con_one_hop() {
        let engine = abc_cycle();
        edge(&engine, "a", "x", "owns");

        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "CON", "params": {"edgeTypes": ["knows"], "direction": "both"}}
            ]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::starting_at(["a"]))
            .expect("execute");
        assert_eq!(result.node_ids, vec![NodeId::from("b"), NodeId::from("c")]);
        assert_eq!(result.edges.len(), 2);
    }

    /// T2.3: DES / ALT / INS round trip over named results.
    #[test]
    fn named_results() {
        let engine = abc_cycle();
        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "DES", "params": {"name": "origin"}},
                {"op": "CON"},
                {"op": "DES", "params": {"name": "next"}},
                {"op": "ALT", "params": {"name": "origin"}},
                {"op": "INS", "params": {"name": "next", "nodeIds": ["z"]}}
            ]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::starting_at(["a"]))
            .expect("execute");
        assert_eq!(
            result.node_ids,
            vec![NodeId::from("a"), NodeId::from("b"), NodeId::from("z")]
        );
        assert_eq!(result.named["next"], vec![NodeId::from("b")]);
    }

    /// T2.4: NUL with `error` fails the run, naming the reason.
    #[test]
    fn nul_error_surfaces() {
        let engine = abc_cycle();
        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "SEG", "params": {"type": "robot"}},
                {"op": "NUL", "params": {"reason": "no robots", "action": "error"}}
            ]))
            .expect("pipeline");
        match engine.execute(&pipeline, ExecuteOptions::default()) {
            Err(StrandError::Nullity { reason }) => assert_eq!(reason, "no robots"),
            other => unreachable!("expected nullity error, got {other:?}"),
        }
    }
}

// =============================================================================
// TIER T3: RECURSIVE TRAVERSAL
// =============================================================================

mod t3_recursive {
    use super::*;

    /// T3.1: find_paths(a, c) over the a/b/c cycle yields a -> b -> c.
    #[test]
    fn abc_cycle_scenario() {
        let engine = abc_cycle();
        let result = engine
            .find_paths(
                "a",
                "c",
                PathOptions {
                    max_depth: Some(5),
                    ..PathOptions::default()
                },
            )
            .expect("paths");

        assert!(!result.paths.is_empty());
        assert!(result.paths.iter().any(|p| {
            p.length == 2
                && p.node_ids == vec![NodeId::from("a"), NodeId::from("b"), NodeId::from("c")]
        }));
        for path in &result.paths {
            let unique: BTreeSet<&NodeId> = path.node_ids.iter().collect();
            assert_eq!(unique.len(), path.node_ids.len());
            assert_eq!(path.nodes.len(), path.node_ids.len());
        }
    }

    /// T3.2: REC over a cycle terminates and never repeats a node in a path.
    #[test]
    fn rec_terminates_on_cycle() {
        let engine = abc_cycle();
        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "REC", "params": {"step": {"direction": "both"}, "until": {"maxDepth": 5}}}
            ]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::starting_at(["a"]))
            .expect("execute");

        assert!(!result.paths.is_empty());
        for path in &result.paths {
            assert!(path.length <= 5);
            let unique: BTreeSet<&NodeId> = path.node_ids.iter().collect();
            assert_eq!(unique.len(), path.node_ids.len());
        }
    }

    /// T3.3: REC + SUP shortest keeps the single shortest path.
    #[test]
    fn shortest_of_several() {
        let engine = GraphEngine::new();
        edge(&engine, "s", "m", "r");
        edge(&engine, "m", "t", "r");
        edge(&engine, "s", "t", "r");

        let result = engine
            .find_paths(
                "s",
                "t",
                PathOptions {
                    shortest: true,
                    ..PathOptions::default()
                },
            )
            .expect("paths");
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].length, 1);
    }

    /// T3.4: Neighbourhood within N hops, then aggregate over the edges.
    #[test]
    fn hops_and_aggregate() {
        let engine = GraphEngine::new();
        let mut amount = Properties::new();
        amount.insert("amount".to_string(), PropertyValue::Number(5.0));
        for (from, to) in [("h", "x"), ("x", "y"), ("y", "z")] {
            engine
                .add_edge(
                    EdgeFact::new(from, to, "paid").with_properties(amount.clone()),
                    None,
                    ProvenanceContext::default(),
                    None,
                )
                .expect("edge");
        }

        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "REC", "params": {"until": {"maxDepth": 2}, "collect": "nodes"}},
                {"op": "SYN", "params": {"mode": "aggregate", "property": "amount", "function": "sum"}},
                {"op": "SYN", "params": {"mode": "count"}}
            ]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::starting_at(["h"]))
            .expect("execute");

        assert_eq!(result.node_ids, vec![NodeId::from("x"), NodeId::from("y")]);
        assert_eq!(result.outputs["sum_amount"], PropertyValue::Number(10.0));
        assert_eq!(result.outputs["node_count"], PropertyValue::Number(2.0));
    }
}

// =============================================================================
// TIER T4: ENGINE GUARANTEES
// =============================================================================

mod t4_engine {
    use super::*;

    /// T4.1: Rebuilding from the same log gives the same answers.
    #[test]
    fn rebuild_is_idempotent() {
        let log: Arc<dyn EventLog> = Arc::new(MemoryLog::new());
        let engine =
            GraphEngine::with_log(Arc::clone(&log), EngineConfig::default()).expect("engine");
        edge(&engine, "a", "b", "knows");
        edge(&engine, "b", "c", "knows");

        let before = engine.find_paths("a", "c", PathOptions::default()).expect("paths");
        let stats_before = engine.get_stats();
        engine.rebuild().expect("rebuild");
        engine.rebuild().expect("rebuild again");
        let after = engine.find_paths("a", "c", PathOptions::default()).expect("paths");

        assert_eq!(before, after);
        assert_eq!(stats_before, engine.get_stats());
    }

    /// T4.2: Running a pipeline never changes the index.
    #[test]
    fn pipelines_are_pure() {
        let engine = abc_cycle();
        let stats = engine.get_stats();
        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "SEG", "params": {"type": "person"}},
                {"op": "REC", "params": {"until": {"maxDepth": 3}}},
                {"op": "SUP", "params": {"mode": "all_nodes"}}
            ]))
            .expect("pipeline");

        let first = engine.execute(&pipeline, ExecuteOptions::default()).expect("first");
        let second = engine.execute(&pipeline, ExecuteOptions::default()).expect("second");
        assert_eq!(first, second);
        assert_eq!(stats, engine.get_stats());
    }

    /// T4.3: Events replayed out of order still link supersession.
    #[test]
    fn out_of_order_replay() {
        let ctx = ProvenanceContext::default();
        let old = FactEvent::edge_created(EdgeFact::new("p", "o", "r"), "t", ctx.clone(), None)
            .expect("old")
            .with_id("old");
        let new = FactEvent::edge_created(
            EdgeFact::new("p", "o", "r"),
            "t",
            ctx,
            Some("old".into()),
        )
        .expect("new")
        .with_id("new");

        let engine = GraphEngine::new();
        engine.rebuild_from(&[new, old]);
        assert!(engine.edge(&"old".into()).is_some_and(|e| e.is_superseded()));
    }

    /// T4.4: Unknown operators degrade to pass-through.
    #[test]
    fn unknown_operator_is_skipped() {
        let engine = abc_cycle();
        let pipeline = engine
            .parse_pipeline(serde_json::json!([
                {"op": "TELEPORT", "params": {"to": "mars"}},
                {"op": "CON"}
            ]))
            .expect("pipeline");
        let result = engine
            .execute(&pipeline, ExecuteOptions::starting_at(["a"]))
            .expect("execute");
        assert_eq!(result.node_ids, vec![NodeId::from("b")]);
    }
}
