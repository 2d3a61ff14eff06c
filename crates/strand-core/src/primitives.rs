//! # Engine Primitives
//!
//! Compiled-in defaults and limits for the Strand engine.
//!
//! Runtime-tunable limits live in [`crate::config::EngineConfig`]; the values
//! here are its defaults and the fixed vocabulary of the fact format.

// =============================================================================
// FACT FORMAT
// =============================================================================

/// The only event kind the engine produces: an asserted ("given") fact.
pub const FACT_KIND: &str = "given";

/// Workspace label used when a fact does not name one.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Source label used when a fact does not name one.
pub const DEFAULT_SOURCE: &str = "user";

/// Confidence assigned when a fact does not state one.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

// =============================================================================
// TRAVERSAL LIMITS
// =============================================================================

/// REC depth used when a step omits `until.maxDepth`.
pub const DEFAULT_RECURSION_DEPTH: usize = 10;

/// Hard ceiling on REC depth.
///
/// All recursive queries must be computationally bounded; a requested depth
/// above this value is rejected when the pipeline is built.
pub const MAX_RECURSION_DEPTH: usize = 100;

/// Depth used by `find_paths` when the caller does not pass one.
pub const DEFAULT_PATH_DEPTH: usize = 5;

/// Maximum number of steps in a single pipeline.
pub const MAX_PIPELINE_STEPS: usize = 256;

// =============================================================================
// NULLITY
// =============================================================================

/// Reason recorded by NUL when the step does not supply one.
pub const DEFAULT_NULLITY_REASON: &str = "empty frontier";
