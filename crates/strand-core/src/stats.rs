//! # Index Statistics
//!
//! Summary counts over an [`EdgeIndex`], computed on demand.

use crate::index::EdgeIndex;
use serde::{Deserialize, Serialize};

/// Counts and vocabularies describing the current index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Distinct node records.
    pub node_count: usize,
    /// Edge versions, superseded ones included.
    pub edge_count: usize,
    /// Edge versions that have been replaced by a newer one.
    pub superseded_count: usize,
    /// Distinct node types, sorted.
    pub node_types: Vec<String>,
    /// Distinct edge types, sorted.
    pub edge_types: Vec<String>,
    /// Distinct provenance sources, sorted.
    pub sources: Vec<String>,
    /// Number of (from, to, type) keys holding more than one version.
    pub conflicting_keys: usize,
}

impl GraphStats {
    /// Compute statistics from an index.
    #[must_use]
    pub fn from_index(index: &EdgeIndex) -> Self {
        Self {
            node_count: index.node_count(),
            edge_count: index.edge_count(),
            superseded_count: index.superseded_count(),
            node_types: index.node_types().map(str::to_string).collect(),
            edge_types: index.edge_types().map(str::to_string).collect(),
            sources: index.sources().map(str::to_string).collect(),
            conflicting_keys: index.conflicting_key_count(),
        }
    }

    /// Active (not superseded) edge versions.
    #[must_use]
    pub fn active_edge_count(&self) -> usize {
        self.edge_count.saturating_sub(self.superseded_count)
    }
}
