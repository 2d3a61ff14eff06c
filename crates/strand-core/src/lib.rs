//! # strand-core
//!
//! The embedded graph-query engine for Strand.
//!
//! Facts ("node created", "edge created") live in an append-only log owned by
//! someone else. This crate derives a provenance-aware [`EdgeIndex`] from
//! them and answers multi-hop queries expressed as pipelines of nine
//! operators:
//!
//! | Op  | Name        | Effect                                    |
//! |-----|-------------|-------------------------------------------|
//! | SEG | select      | choose / filter nodes                     |
//! | CON | connect     | one hop                                   |
//! | REC | recurse     | bounded multi-hop with path collection    |
//! | SUP | superpose   | collapse paths                            |
//! | SYN | synthesize  | count / aggregate                         |
//! | DES | designate   | name the frontier                         |
//! | ALT | alternate   | return to a named frontier                |
//! | NUL | nullify     | make empty results explicit               |
//! | INS | insert      | add nodes to the frontier                 |
//!
//! ## Architectural Constraints
//!
//! - Pure, synchronous Rust: no async, no network, no I/O in pipelines
//! - Deterministic: ordered collections only
//! - The index is derived and can be rebuilt from the log at any time
//! - Pipelines read the index and never write to it

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod engine;
pub mod event;
pub mod index;
pub mod log;
pub mod ops;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod stats;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    CompareOp, Edge, EdgeKey, EventId, Node, NodeId, Properties, PropertyFilter, PropertyValue,
    ProvenanceContext, StrandError,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use config::EngineConfig;
pub use engine::{
    ConflictSet, ContextOptions, ExecuteOptions, FormattedPath, GraphEngine, PathOptions,
    QueryResult,
};
pub use event::{EdgeFact, FactEvent, FactPayload, NodeFact};
pub use index::{Direction, EdgeIndex, EdgeRef, ProvenanceFilter, TraverseOptions};
pub use log::{EventLog, MemoryLog, Subscriber, Subscription, SubscriptionId};
pub use ops::Step;
pub use pipeline::Pipeline;
pub use state::{NullAction, Nullity, Path, TraversalState};
pub use stats::GraphStats;
