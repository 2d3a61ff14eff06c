//! # CLI Command Implementations
//!
//! Every command opens the JSON-lines log, builds a log-backed engine over
//! it and runs one engine operation.

use super::{ProvenanceArgs, TraversalArgs};
use crate::api;
use crate::config::AppConfig;
use crate::store::JsonlLog;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use strand_core::{
    ContextOptions, EdgeFact, EventId, EventLog, GraphEngine, NodeFact, PathOptions, Properties,
    ProvenanceFilter, QueryResult, StrandError,
};

/// Maximum pipeline file size (1 MB).
const MAX_PIPELINE_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// HELPERS
// =============================================================================

/// Open the log at `events` and build an engine over it.
pub fn open_engine(events: &Path, config: &AppConfig) -> Result<GraphEngine, StrandError> {
    let log: Arc<dyn EventLog> = Arc::new(JsonlLog::open(events)?);
    Ok(GraphEngine::with_log(log, config.engine.clone())?.with_actor(config.actor.as_str()))
}

/// Validate file path and size before reading.
fn read_small_file(path: &Path, max_size: u64) -> Result<String, StrandError> {
    let canonical = path.canonicalize().map_err(|e| {
        StrandError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(StrandError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| StrandError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(StrandError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read_to_string(&canonical)
        .map_err(|e| StrandError::Io(format!("Cannot read '{}': {}", path.display(), e)))
}

fn parse_props(props: Option<&str>) -> Result<Properties, StrandError> {
    match props {
        Some(text) => serde_json::from_str(text)
            .map_err(|e| StrandError::Serialization(format!("--props: {}", e))),
        None => Ok(Properties::new()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_result(result: &QueryResult, json_mode: bool) {
    if json_mode {
        print_json(result);
        return;
    }

    println!("Nodes ({}):", result.node_ids.len());
    for id in &result.node_ids {
        println!("  {}", id);
    }
    if !result.paths.is_empty() {
        println!();
        println!("Paths ({}):", result.paths.len());
        for path in &result.paths {
            let hops: Vec<&str> = path.node_ids.iter().map(|id| id.as_str()).collect();
            println!("  [{}] {}", path.length, hops.join(" -> "));
        }
    }
    if !result.outputs.is_empty() {
        println!();
        println!("Outputs:");
        for (name, value) in &result.outputs {
            println!(
                "  {}: {}",
                name,
                serde_json::to_string(value).unwrap_or_default()
            );
        }
    }
    if let Some(nullity) = &result.nullity {
        println!();
        println!("Empty result: {}", nullity.reason);
    }
}

impl TraversalArgs {
    fn options(&self, max_depth: Option<usize>, shortest: bool) -> (PathOptions, ContextOptions) {
        let provenance = (self.min_confidence.is_some() || !self.sources.is_empty()).then(|| {
            ProvenanceFilter {
                min_confidence: self.min_confidence,
                sources: self.sources.clone(),
                ..ProvenanceFilter::default()
            }
        });
        (
            PathOptions {
                max_depth,
                edge_types: self.edge_types.clone(),
                direction: self.direction,
                shortest,
            },
            ContextOptions {
                provenance,
                active_only: self.active_only,
            },
        )
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(events: &Path, config: &AppConfig) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let stats = engine.get_stats();

    println!("Strand Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:   {}", config.server.host);
    println!("  Port:   {}", config.server.port);
    println!("  Events: {:?}", events);
    println!("  Nodes:  {}", stats.node_count);
    println!("  Edges:  {}", stats.edge_count);
    println!();
    println!("Endpoints:");
    println!("  GET  /health            - Health check");
    println!("  GET  /stats             - Index statistics");
    println!("  POST /nodes             - Record a node");
    println!("  POST /edges             - Record an edge");
    println!("  POST /execute           - Run a pipeline");
    println!("  POST /paths             - Paths between two nodes");
    println!("  POST /hops              - Nodes within N hops");
    println!("  GET  /conflicts         - Conflicting edge versions");
    println!("  GET  /edges/{{id}}/chain  - Supersession chain");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(engine, &config.server).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show index statistics.
pub fn cmd_status(events: &Path, config: &AppConfig, json_mode: bool) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let stats = engine.get_stats();

    if json_mode {
        let output = serde_json::json!({
            "events": events.to_string_lossy(),
            "node_count": stats.node_count,
            "edge_count": stats.edge_count,
            "active_edge_count": stats.active_edge_count(),
            "superseded_count": stats.superseded_count,
            "conflicting_keys": stats.conflicting_keys,
            "node_types": stats.node_types,
            "edge_types": stats.edge_types,
            "sources": stats.sources,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Strand Index Status");
    println!("===================");
    println!("Events:           {:?}", events);
    println!();
    println!("Nodes:            {}", stats.node_count);
    println!("Edges:            {}", stats.edge_count);
    println!("Active Edges:     {}", stats.active_edge_count());
    println!("Superseded:       {}", stats.superseded_count);
    println!("Conflicting Keys: {}", stats.conflicting_keys);
    println!();
    println!("Node Types: {}", stats.node_types.join(", "));
    println!("Edge Types: {}", stats.edge_types.join(", "));
    println!("Sources:    {}", stats.sources.join(", "));

    Ok(())
}

// =============================================================================
// FACT COMMANDS
// =============================================================================

/// Record a node fact.
pub fn cmd_add_node(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    id: String,
    node_type: String,
    props: Option<&str>,
    provenance: &ProvenanceArgs,
) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let node = NodeFact {
        id: id.into(),
        node_type,
        properties: parse_props(props)?,
    };
    let event_id = engine.add_node(node, provenance.actor.as_deref(), provenance.to_context())?;
    report_fact(&event_id, json_mode);
    Ok(())
}

/// Command-line fields of a new edge.
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub edge_type: String,
    pub props: Option<String>,
    pub supersedes: Option<String>,
}

/// Record an edge fact.
pub fn cmd_add_edge(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    spec: EdgeSpec,
    provenance: &ProvenanceArgs,
) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let edge = EdgeFact::new(spec.from, spec.to, spec.edge_type)
        .with_properties(parse_props(spec.props.as_deref())?);
    let supersedes = spec.supersedes.map(EventId::from);
    let event_id = engine.add_edge(
        edge,
        provenance.actor.as_deref(),
        provenance.to_context(),
        supersedes,
    )?;
    report_fact(&event_id, json_mode);
    Ok(())
}

fn report_fact(event_id: &EventId, json_mode: bool) {
    if json_mode {
        print_json(&serde_json::json!({ "success": true, "event_id": event_id }));
    } else {
        println!("Recorded {}", event_id);
    }
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Run a pipeline read from `file`.
pub fn cmd_query(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    file: &Path,
    start: Vec<String>,
) -> Result<(), StrandError> {
    let text = read_small_file(file, MAX_PIPELINE_FILE_SIZE)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let engine = open_engine(events, config)?;
    let pipeline = engine.parse_pipeline(value)?;
    tracing::debug!(steps = pipeline.len(), "pipeline loaded");

    let result = engine.execute(
        &pipeline,
        strand_core::ExecuteOptions::starting_at(start),
    )?;
    print_result(&result, json_mode);
    Ok(())
}

/// Find paths between two nodes.
pub fn cmd_paths(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    from: &str,
    to: &str,
    max_depth: Option<usize>,
    shortest: bool,
    traversal: &TraversalArgs,
) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let (options, context) = traversal.options(max_depth, shortest);
    let result = engine.find_paths_with_context(from, to, options, context)?;
    print_result(&result, json_mode);
    Ok(())
}

/// List nodes within `hops` of `start`.
pub fn cmd_hops(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    start: &str,
    hops: usize,
    traversal: &TraversalArgs,
) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let (options, context) = traversal.options(Some(hops), false);
    let result = engine.find_within_hops(start, hops, options, context)?;
    print_result(&result, json_mode);
    Ok(())
}

// =============================================================================
// INSPECTION COMMANDS
// =============================================================================

/// List relationships with more than one version.
pub fn cmd_conflicts(events: &Path, config: &AppConfig, json_mode: bool) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let conflicts = engine.get_conflicting_edges();

    if json_mode {
        print_json(&conflicts);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicting edges.");
        return Ok(());
    }
    for conflict in &conflicts {
        println!(
            "{} -[{}]-> {} ({} versions)",
            conflict.key.from,
            conflict.key.edge_type,
            conflict.key.to,
            conflict.versions.len()
        );
        for edge in &conflict.versions {
            let marker = if edge.is_superseded() { "superseded" } else { "active" };
            println!(
                "  {} source={} confidence={} {}",
                edge.id, edge.context.source, edge.context.confidence, marker
            );
        }
    }
    Ok(())
}

/// Show the supersession chain through `id`.
pub fn cmd_chain(
    events: &Path,
    config: &AppConfig,
    json_mode: bool,
    id: &str,
) -> Result<(), StrandError> {
    let engine = open_engine(events, config)?;
    let chain = engine.get_supersession_chain(&EventId::from(id));

    if json_mode {
        print_json(&chain);
        return Ok(());
    }

    if chain.is_empty() {
        println!("Unknown edge {}", id);
        return Ok(());
    }
    for (position, edge) in chain.iter().enumerate() {
        println!(
            "{}. {} ({} -[{}]-> {}) source={}",
            position + 1,
            edge.id,
            edge.from,
            edge.edge_type,
            edge.to,
            edge.context.source
        );
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::{NodeId, ProvenanceContext};
    use tempfile::TempDir;

    #[test]
    fn engine_reopens_with_recorded_facts() {
        let dir = TempDir::new().expect("tempdir");
        let events = dir.path().join("facts.jsonl");
        let config = AppConfig::default();

        let edge_id = {
            let engine = open_engine(&events, &config).expect("open");
            engine
                .add_edge(
                    EdgeFact::new("a", "b", "knows"),
                    None,
                    ProvenanceContext::from_source("cli"),
                    None,
                )
                .expect("edge")
        };

        let engine = open_engine(&events, &config).expect("reopen");
        let edge = engine.edge(&edge_id).expect("edge survives");
        assert_eq!(edge.from, NodeId::from("a"));
        assert_eq!(edge.context.source, "cli");
    }

    #[test]
    fn props_must_be_an_object() {
        let props = parse_props(Some(r#"{"age": 42}"#)).expect("object");
        assert_eq!(props.len(), 1);
        assert!(parse_props(Some("[1, 2]")).is_err());
        assert!(parse_props(None).expect("none").is_empty());
    }

    #[test]
    fn traversal_args_build_a_provenance_filter() {
        let args = TraversalArgs {
            direction: strand_core::Direction::Both,
            edge_types: vec!["knows".to_string()],
            min_confidence: Some(0.5),
            sources: Vec::new(),
            active_only: true,
        };
        let (options, context) = args.options(Some(3), true);
        assert_eq!(options.max_depth, Some(3));
        assert!(options.shortest);
        assert!(context.active_only);
        assert_eq!(
            context.provenance.and_then(|p| p.min_confidence),
            Some(0.5)
        );
    }

    #[test]
    fn pipeline_file_must_exist() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            read_small_file(&missing, MAX_PIPELINE_FILE_SIZE),
            Err(StrandError::Io(_))
        ));
    }
}
