//! # Strand CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show index statistics
//! - `add-node` / `add-edge` - Record facts
//! - `query` - Run a pipeline from a JSON file
//! - `paths` - Paths between two nodes
//! - `hops` - Nodes within N hops
//! - `conflicts` - Relationships with several versions
//! - `chain` - Supersession chain of an edge

mod commands;

use crate::config::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use strand_core::{Direction, ProvenanceContext, StrandError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Strand - provenance-aware graph queries over an append-only fact log.
#[derive(Parser, Debug)]
#[command(name = "strand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the JSON-lines event log
    #[arg(short, long, global = true)]
    pub events: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Provenance flags shared by the fact-recording commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ProvenanceArgs {
    /// Where the fact came from
    #[arg(long)]
    pub source: Option<String>,

    /// Confidence in [0, 1]
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Supporting document reference
    #[arg(long)]
    pub document: Option<String>,

    /// Workspace the fact belongs to
    #[arg(long)]
    pub workspace: Option<String>,

    /// Who asserts the fact (defaults to the configured actor)
    #[arg(long)]
    pub actor: Option<String>,
}

impl ProvenanceArgs {
    #[must_use]
    pub fn to_context(&self) -> ProvenanceContext {
        let mut context = ProvenanceContext::default();
        if let Some(source) = &self.source {
            context.source.clone_from(source);
        }
        if let Some(confidence) = self.confidence {
            context.confidence = confidence;
        }
        if let Some(document) = &self.document {
            context.document_ref = Some(document.clone());
        }
        if let Some(workspace) = &self.workspace {
            context.workspace.clone_from(workspace);
        }
        context
    }
}

/// Traversal flags shared by `paths` and `hops`.
#[derive(Args, Debug, Clone)]
pub struct TraversalArgs {
    /// Direction to follow: outgoing, incoming or both
    #[arg(short = 'd', long, default_value = "outgoing")]
    pub direction: Direction,

    /// Edge types to follow (repeat or comma-separate; empty = all)
    #[arg(short = 't', long = "edge-type", value_delimiter = ',')]
    pub edge_types: Vec<String>,

    /// Ignore edges below this confidence
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Only follow edges from these sources
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Ignore superseded edge versions
    #[arg(long)]
    pub active_only: bool,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show index statistics
    Status,

    /// Record a node fact
    AddNode {
        /// Node id
        id: String,

        /// Node type
        #[arg(short = 't', long = "type")]
        node_type: String,

        /// Properties as a JSON object
        #[arg(long)]
        props: Option<String>,

        #[command(flatten)]
        provenance: ProvenanceArgs,
    },

    /// Record an edge fact
    AddEdge {
        /// Origin node id
        from: String,

        /// Destination node id
        to: String,

        /// Edge type
        #[arg(short = 't', long = "type")]
        edge_type: String,

        /// Properties as a JSON object
        #[arg(long)]
        props: Option<String>,

        /// Id of the edge version this one replaces
        #[arg(long)]
        supersedes: Option<String>,

        #[command(flatten)]
        provenance: ProvenanceArgs,
    },

    /// Run a pipeline read from a JSON file
    Query {
        /// File holding an array of {op, params} steps
        #[arg(short, long)]
        file: PathBuf,

        /// Start nodes (repeat or comma-separate)
        #[arg(short, long, value_delimiter = ',')]
        start: Vec<String>,
    },

    /// Find paths between two nodes
    Paths {
        from: String,
        to: String,

        /// Hop limit
        #[arg(short, long)]
        max_depth: Option<usize>,

        /// Keep only the shortest path
        #[arg(long)]
        shortest: bool,

        #[command(flatten)]
        traversal: TraversalArgs,
    },

    /// List nodes within N hops of a start node
    Hops {
        start: String,

        /// Hop limit
        #[arg(short = 'n', long, default_value = "2")]
        hops: usize,

        #[command(flatten)]
        traversal: TraversalArgs,
    },

    /// List relationships that have more than one version
    Conflicts,

    /// Show the supersession chain of an edge
    Chain {
        /// Edge (event) id
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StrandError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    let events = config.events_path(cli.events.as_deref());
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(events = %events.display(), "using event log");
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&events, &config).await
        }
        Some(Commands::Status) | None => cmd_status(&events, &config, json_mode),
        Some(Commands::AddNode {
            id,
            node_type,
            props,
            provenance,
        }) => cmd_add_node(
            &events,
            &config,
            json_mode,
            id,
            node_type,
            props.as_deref(),
            &provenance,
        ),
        Some(Commands::AddEdge {
            from,
            to,
            edge_type,
            props,
            supersedes,
            provenance,
        }) => cmd_add_edge(
            &events,
            &config,
            json_mode,
            EdgeSpec {
                from,
                to,
                edge_type,
                props,
                supersedes,
            },
            &provenance,
        ),
        Some(Commands::Query { file, start }) => {
            cmd_query(&events, &config, json_mode, &file, start)
        }
        Some(Commands::Paths {
            from,
            to,
            max_depth,
            shortest,
            traversal,
        }) => cmd_paths(
            &events, &config, json_mode, &from, &to, max_depth, shortest, &traversal,
        ),
        Some(Commands::Hops {
            start,
            hops,
            traversal,
        }) => cmd_hops(&events, &config, json_mode, &start, hops, &traversal),
        Some(Commands::Conflicts) => cmd_conflicts(&events, &config, json_mode),
        Some(Commands::Chain { id }) => cmd_chain(&events, &config, json_mode, &id),
    }
}
