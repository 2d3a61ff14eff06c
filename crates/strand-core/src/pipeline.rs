//! # Pipeline Evaluator
//!
//! A [`Pipeline`] is a validated, ordered list of [`Step`]s. Running it folds
//! the steps over a [`TraversalState`]; the index is only ever read.
//!
//! After every step the evaluator looks at the state's nullity record:
//! `stop` ends the run with the current state, `error` fails the run with
//! [`StrandError::Nullity`], `continue` (or no record) moves on.

use crate::config::EngineConfig;
use crate::index::EdgeIndex;
use crate::ops::{Step, SynthesizeMode};
use crate::state::{NullAction, TraversalState};
use crate::{CompareOp, PropertyFilter, StrandError};

/// A validated sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Validate `steps` against the default engine limits.
    pub fn new(steps: Vec<Step>) -> Result<Self, StrandError> {
        Self::with_config(steps, &EngineConfig::default())
    }

    /// Validate `steps` against `config`.
    ///
    /// REC steps without a `maxDepth` get `config.default_recursion_depth`.
    pub fn with_config(mut steps: Vec<Step>, config: &EngineConfig) -> Result<Self, StrandError> {
        if steps.len() > config.max_pipeline_steps {
            return Err(StrandError::InvalidPipeline(format!(
                "{} steps exceeds the limit of {}",
                steps.len(),
                config.max_pipeline_steps
            )));
        }

        for (position, step) in steps.iter_mut().enumerate() {
            validate_step(step, config)
                .map_err(|reason| StrandError::InvalidPipeline(format!("step {position}: {reason}")))?;
        }

        Ok(Self { steps })
    }

    /// Parse a JSON array of `{op, params}` objects and validate it.
    pub fn from_json(json: &str, config: &EngineConfig) -> Result<Self, StrandError> {
        let steps: Vec<Step> = serde_json::from_str(json)
            .map_err(|e| StrandError::InvalidPipeline(e.to_string()))?;
        Self::with_config(steps, config)
    }

    /// Same as [`Pipeline::from_json`] for an already parsed value.
    pub fn from_value(value: serde_json::Value, config: &EngineConfig) -> Result<Self, StrandError> {
        let steps: Vec<Step> = serde_json::from_value(value)
            .map_err(|e| StrandError::InvalidPipeline(e.to_string()))?;
        Self::with_config(steps, config)
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step over `initial`.
    pub fn run(&self, initial: TraversalState, index: &EdgeIndex) -> Result<TraversalState, StrandError> {
        let mut state = initial;
        for (position, step) in self.steps.iter().enumerate() {
            state = step.apply(&state, index);
            tracing::debug!(
                step = position,
                op = step.op(),
                frontier = state.frontier.len(),
                paths = state.paths.len(),
                "pipeline step applied"
            );

            if let Some(nullity) = &state.nullity {
                match nullity.action {
                    NullAction::Continue => {}
                    NullAction::Stop => {
                        tracing::debug!(step = position, reason = %nullity.reason, "pipeline stopped on nullity");
                        return Ok(state);
                    }
                    NullAction::Error => {
                        return Err(StrandError::Nullity {
                            reason: nullity.reason.clone(),
                        });
                    }
                }
            }
        }
        Ok(state)
    }
}

fn validate_step(step: &mut Step, config: &EngineConfig) -> Result<(), String> {
    match step {
        Step::Select(p) => check_filter(p.filter.as_ref()),
        Step::Connect(p) => check_filter(p.filter.as_ref()),
        Step::Recurse(p) => {
            let depth = *p.until.max_depth.get_or_insert(config.default_recursion_depth);
            if depth > config.max_recursion_depth {
                return Err(format!(
                    "REC maxDepth {depth} exceeds the ceiling of {}",
                    config.max_recursion_depth
                ));
            }
            check_filter(p.step.filter.as_ref())?;
            check_filter(p.until.condition.as_ref().and_then(|c| c.filter.as_ref()))
        }
        Step::Synthesize(p) if p.mode == SynthesizeMode::Aggregate => {
            match p.property.as_deref() {
                Some(property) if !property.is_empty() => Ok(()),
                _ => Err("SYN aggregate needs a property".to_string()),
            }
        }
        Step::Designate(p) if p.name.is_empty() => Err("DES needs a non-empty name".to_string()),
        Step::Alternate(p) if p.name.is_empty() => Err("ALT needs a non-empty name".to_string()),
        Step::Superpose(_)
        | Step::Synthesize(_)
        | Step::Designate(_)
        | Step::Alternate(_)
        | Step::Nullify(_)
        | Step::Insert(_)
        | Step::Unknown { .. } => Ok(()),
    }
}

/// Every operator except `exists` compares against a value.
fn check_filter(filter: Option<&PropertyFilter>) -> Result<(), String> {
    match filter {
        Some(f) if f.op != CompareOp::Exists && f.value.is_null() => {
            Err(format!("filter on `{}` has no value", f.key))
        }
        _ => Ok(()),
    }
}
