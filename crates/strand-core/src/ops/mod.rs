//! # Operators
//!
//! The nine traversal operators and their parameter types.
//!
//! | Op  | Module       | Effect                                         |
//! |-----|--------------|------------------------------------------------|
//! | SEG | `select`     | choose / filter the frontier                   |
//! | CON | `connect`    | one hop along matching edges                   |
//! | REC | `recurse`    | bounded repeated CON with path collection      |
//! | SUP | `superpose`  | collapse accumulated paths                     |
//! | SYN | `superpose`  | collapse, count or aggregate into outputs      |
//! | DES | `naming`     | save the frontier under a name                 |
//! | ALT | `naming`     | restore a saved frontier                       |
//! | INS | `naming`     | add nodes to the frontier                      |
//! | NUL | `nullify`    | record an explicit empty result                |
//!
//! Every operator is a pure function `(params, state, index) -> state`.
//!
//! On the wire a step is `{"op": "SEG", "params": {...}}`. An unrecognised
//! `op` becomes [`Step::Unknown`], which the evaluator skips with a warning.

pub mod connect;
pub mod naming;
pub mod nullify;
pub mod recurse;
pub mod select;
pub mod superpose;

use crate::index::{Direction, EdgeIndex, ProvenanceFilter, TraverseOptions};
use crate::state::{NullAction, TraversalState};
use crate::{Node, NodeId, PropertyFilter, PropertyValue};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// STEP
// =============================================================================

/// One pipeline step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawStep")]
pub enum Step {
    Select(SelectParams),
    Connect(ConnectParams),
    Recurse(RecurseParams),
    Superpose(SuperposeParams),
    Synthesize(SynthesizeParams),
    Designate(NameParams),
    Alternate(NameParams),
    Nullify(NullifyParams),
    Insert(InsertParams),
    /// An operator this engine does not know. Passes the state through.
    Unknown { op: String },
}

impl Step {
    /// The wire name of this step's operator.
    #[must_use]
    pub fn op(&self) -> &str {
        match self {
            Self::Select(_) => "SEG",
            Self::Connect(_) => "CON",
            Self::Recurse(_) => "REC",
            Self::Superpose(_) => "SUP",
            Self::Synthesize(_) => "SYN",
            Self::Designate(_) => "DES",
            Self::Alternate(_) => "ALT",
            Self::Nullify(_) => "NUL",
            Self::Insert(_) => "INS",
            Self::Unknown { op } => op,
        }
    }

    /// Apply this step to `state`.
    #[must_use]
    pub fn apply(&self, state: &TraversalState, index: &EdgeIndex) -> TraversalState {
        match self {
            Self::Select(p) => select::apply(p, state, index),
            Self::Connect(p) => connect::apply(p, state, index),
            Self::Recurse(p) => recurse::apply(p, state, index),
            Self::Superpose(p) => superpose::superpose(p, state),
            Self::Synthesize(p) => superpose::synthesize(p, state),
            Self::Designate(p) => naming::designate(p, state),
            Self::Alternate(p) => naming::alternate(p, state),
            Self::Nullify(p) => nullify::apply(p, state),
            Self::Insert(p) => naming::insert(p, state),
            Self::Unknown { op } => {
                tracing::warn!(op = %op, "unknown operator, passing state through");
                state.clone()
            }
        }
    }
}

/// Wire form of a step before the operator is resolved.
#[derive(Deserialize)]
struct RawStep {
    op: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl TryFrom<RawStep> for Step {
    type Error = serde_json::Error;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let params = if raw.params.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            raw.params
        };

        Ok(match raw.op.to_ascii_uppercase().as_str() {
            "SEG" => Self::Select(serde_json::from_value(params)?),
            "CON" => Self::Connect(serde_json::from_value(params)?),
            "REC" => Self::Recurse(serde_json::from_value(params)?),
            "SUP" => Self::Superpose(serde_json::from_value(params)?),
            "SYN" => Self::Synthesize(serde_json::from_value(params)?),
            "DES" => Self::Designate(serde_json::from_value(params)?),
            "ALT" => Self::Alternate(serde_json::from_value(params)?),
            "NUL" => Self::Nullify(serde_json::from_value(params)?),
            "INS" => Self::Insert(serde_json::from_value(params)?),
            _ => Self::Unknown { op: raw.op },
        })
    }
}

/// Accepts either `"x"` or `["x", "y"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

// =============================================================================
// SEG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectParams {
    /// Select exactly this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    /// Node type allow-list.
    #[serde(
        alias = "type",
        alias = "nodeType",
        alias = "nodeTypes",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
    pub exclude_visited: bool,
    /// Keep only nodes also present in this named result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersect_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl SelectParams {
    #[must_use]
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self {
            node_id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn of_type(node_type: impl Into<String>) -> Self {
        Self {
            types: vec![node_type.into()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn has_node_criteria(&self) -> bool {
        !self.types.is_empty() || self.filter.is_some()
    }

    /// Type and property test. A node with no record only passes when no
    /// type is required.
    fn accepts(&self, node: Option<&Node>) -> bool {
        match node {
            Some(node) => {
                (self.types.is_empty() || self.types.iter().any(|t| *t == node.node_type))
                    && self
                        .filter
                        .as_ref()
                        .is_none_or(|f| f.matches(&node.properties))
            }
            None => {
                self.types.is_empty()
                    && self
                        .filter
                        .as_ref()
                        .is_none_or(|f| f.matches(&crate::Properties::new()))
            }
        }
    }
}

// =============================================================================
// CON
// =============================================================================

/// What a CON (or the hop inside REC) contributes to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    Nodes,
    Edges,
    #[default]
    Both,
}

impl ReturnMode {
    #[must_use]
    pub fn includes_nodes(self) -> bool {
        matches!(self, Self::Nodes | Self::Both)
    }

    #[must_use]
    pub fn includes_edges(self) -> bool {
        matches!(self, Self::Edges | Self::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectParams {
    pub direction: Direction,
    #[serde(
        alias = "edgeType",
        alias = "types",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub edge_types: Vec<String>,
    /// Test against edge properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<ProvenanceFilter>,
    pub active_only: bool,
    #[serde(rename = "return")]
    pub return_mode: ReturnMode,
}

impl ConnectParams {
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn edge_types(mut self, types: Vec<String>) -> Self {
        self.edge_types = types;
        self
    }

    #[must_use]
    pub fn provenance(mut self, provenance: Option<ProvenanceFilter>) -> Self {
        self.provenance = provenance;
        self
    }

    #[must_use]
    pub fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// The index options this hop traverses with.
    #[must_use]
    pub fn traverse_options(&self) -> TraverseOptions {
        let mut options = TraverseOptions::new(self.direction)
            .edge_types(self.edge_types.iter().cloned())
            .active_only(self.active_only);
        if let Some(provenance) = &self.provenance {
            options = options.provenance(provenance.clone());
        }
        if let Some(filter) = &self.filter {
            let filter = filter.clone();
            options = options.filter(move |edge| filter.matches(&edge.properties));
        }
        options
    }
}

// =============================================================================
// REC
// =============================================================================

/// What REC leaves in the state once it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    #[default]
    Paths,
    Nodes,
    TerminalNodes,
}

/// Test applied to nodes freshly reached by REC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(alias = "property", skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
}

impl NodeCondition {
    /// Unknown nodes never satisfy a condition.
    #[must_use]
    pub fn matches(&self, node: Option<&Node>) -> bool {
        let Some(node) = node else {
            return false;
        };
        self.node_type.as_ref().is_none_or(|t| *t == node.node_type)
            && self
                .filter
                .as_ref()
                .is_none_or(|f| f.matches(&node.properties))
    }
}

/// Termination policy for REC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Until {
    /// Filled in from the engine configuration when the pipeline is built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_reached: Option<NodeId>,
    pub fixed_point: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<NodeCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurseParams {
    /// The hop repeated each round. Accepts a bare CON parameter object or a
    /// full `{"op": "CON", "params": {...}}` step.
    #[serde(alias = "hop", deserialize_with = "embedded_hop")]
    pub step: ConnectParams,
    pub until: Until,
    pub collect: CollectMode,
}

impl RecurseParams {
    #[must_use]
    pub fn new(step: ConnectParams) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.until.max_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<NodeId>) -> Self {
        self.until.target_reached = Some(target.into());
        self
    }

    #[must_use]
    pub fn collect(mut self, collect: CollectMode) -> Self {
        self.collect = collect;
        self
    }
}

fn embedded_hop<'de, D>(deserializer: D) -> Result<ConnectParams, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hop {
        Wrapped {
            op: String,
            #[serde(default)]
            params: Option<ConnectParams>,
        },
        Bare(ConnectParams),
    }

    Ok(match Hop::deserialize(deserializer)? {
        Hop::Wrapped { op, params } => {
            if !op.eq_ignore_ascii_case("CON") {
                tracing::warn!(op = %op, "REC embeds a non-CON step, treating it as CON");
            }
            params.unwrap_or_default()
        }
        Hop::Bare(params) => params,
    })
}

// =============================================================================
// SUP / SYN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperposeMode {
    Shortest,
    AllPaths,
    AllNodes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperposeParams {
    #[serde(alias = "strategy")]
    pub mode: SuperposeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesizeMode {
    ShortestPath,
    AllPaths,
    UnionNodes,
    Count,
    Aggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Sum,
    Avg,
    Min,
    Max,
    #[default]
    Count,
}

impl AggregateFn {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeParams {
    #[serde(alias = "strategy")]
    pub mode: SynthesizeMode,
    /// Edge property read by `aggregate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, alias = "fn", alias = "aggregate")]
    pub function: AggregateFn,
    /// Output name for `aggregate`. Defaults to `<function>_<property>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl SynthesizeParams {
    #[must_use]
    pub fn new(mode: SynthesizeMode) -> Self {
        Self {
            mode,
            property: None,
            function: AggregateFn::default(),
            output: None,
        }
    }

    #[must_use]
    pub fn aggregate(function: AggregateFn, property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            function,
            ..Self::new(SynthesizeMode::Aggregate)
        }
    }
}

// =============================================================================
// DES / ALT / INS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameParams {
    pub name: String,
}

impl NameParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsertParams {
    #[serde(alias = "nodes", skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<NodeId>,
    /// Named result to merge in.
    #[serde(alias = "from", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// NUL
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullifyParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub action: NullAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(value: serde_json::Value) -> Step {
        serde_json::from_value(value).expect("step")
    }

    #[test]
    fn steps_parse_from_wire_shape() {
        assert_eq!(
            step(json!({"op": "SEG", "params": {"nodeId": "a"}})),
            Step::Select(SelectParams::node("a"))
        );
        assert_eq!(
            step(json!({"op": "SEG", "params": {"type": "person"}})),
            Step::Select(SelectParams::of_type("person"))
        );
        assert!(matches!(
            step(json!({"op": "con", "params": {"edgeTypes": ["knows"], "direction": "in"}})),
            Step::Connect(ConnectParams { direction: Direction::Incoming, .. })
        ));
    }

    #[test]
    fn missing_params_mean_defaults() {
        assert_eq!(
            step(json!({"op": "NUL"})),
            Step::Nullify(NullifyParams::default())
        );
        assert_eq!(
            step(json!({"op": "CON", "params": null})),
            Step::Connect(ConnectParams::default())
        );
    }

    #[test]
    fn unknown_op_is_kept_not_rejected() {
        let s = step(json!({"op": "FLY", "params": {"x": 1}}));
        assert_eq!(s, Step::Unknown { op: "FLY".to_string() });
        assert_eq!(s.op(), "FLY");
    }

    #[test]
    fn rec_accepts_wrapped_or_bare_hop() {
        let wrapped = step(json!({
            "op": "REC",
            "params": {
                "step": {"op": "CON", "params": {"edgeTypes": ["knows"]}},
                "until": {"maxDepth": 3, "targetReached": "c"},
                "collect": "paths"
            }
        }));
        let bare = step(json!({
            "op": "REC",
            "params": {
                "step": {"edgeTypes": ["knows"]},
                "until": {"maxDepth": 3, "targetReached": "c"}
            }
        }));
        assert_eq!(wrapped, bare);
        let Step::Recurse(rec) = wrapped else {
            unreachable!("expected REC");
        };
        assert_eq!(rec.until.max_depth, Some(3));
        assert_eq!(rec.step.edge_types, vec!["knows"]);
        assert_eq!(rec.collect, CollectMode::Paths);
    }

    #[test]
    fn malformed_params_are_errors() {
        let result: Result<Step, _> =
            serde_json::from_value(json!({"op": "SUP", "params": {"mode": "widest"}}));
        assert!(result.is_err());
    }

    #[test]
    fn syn_aggregate_params() {
        let s = step(json!({
            "op": "SYN",
            "params": {"mode": "aggregate", "property": "amount", "function": "sum"}
        }));
        assert_eq!(
            s,
            Step::Synthesize(SynthesizeParams::aggregate(AggregateFn::Sum, "amount"))
        );
    }

    #[test]
    fn return_mode_flags() {
        assert!(ReturnMode::Both.includes_nodes() && ReturnMode::Both.includes_edges());
        assert!(!ReturnMode::Nodes.includes_edges());
        assert!(!ReturnMode::Edges.includes_nodes());
    }
}
