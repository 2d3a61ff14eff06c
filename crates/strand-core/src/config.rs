//! # Engine Configuration
//!
//! Limits applied when pipelines are built and executed. Deserializable so the
//! application can embed it in its TOML configuration under `[engine]`.

use crate::StrandError;
use crate::primitives::{
    DEFAULT_PATH_DEPTH, DEFAULT_RECURSION_DEPTH, MAX_PIPELINE_STEPS, MAX_RECURSION_DEPTH,
};
use serde::{Deserialize, Serialize};

/// Tunable engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceiling for any REC `maxDepth`. May lower, never raise, the
    /// compiled-in ceiling.
    pub max_recursion_depth: usize,
    /// REC depth when a step does not specify one.
    pub default_recursion_depth: usize,
    /// Depth for `find_paths` / `find_paths_with_context` when unspecified.
    pub default_path_depth: usize,
    /// Maximum number of steps accepted in one pipeline.
    pub max_pipeline_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: MAX_RECURSION_DEPTH,
            default_recursion_depth: DEFAULT_RECURSION_DEPTH,
            default_path_depth: DEFAULT_PATH_DEPTH,
            max_pipeline_steps: MAX_PIPELINE_STEPS,
        }
    }
}

impl EngineConfig {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), StrandError> {
        if self.max_recursion_depth == 0 || self.max_recursion_depth > MAX_RECURSION_DEPTH {
            return Err(StrandError::Config(format!(
                "max_recursion_depth must be between 1 and {MAX_RECURSION_DEPTH}"
            )));
        }
        if self.default_recursion_depth > self.max_recursion_depth {
            return Err(StrandError::Config(format!(
                "default_recursion_depth {} exceeds max_recursion_depth {}",
                self.default_recursion_depth, self.max_recursion_depth
            )));
        }
        if self.default_path_depth > self.max_recursion_depth {
            return Err(StrandError::Config(format!(
                "default_path_depth {} exceeds max_recursion_depth {}",
                self.default_path_depth, self.max_recursion_depth
            )));
        }
        if self.max_pipeline_steps == 0 {
            return Err(StrandError::Config(
                "max_pipeline_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn default_depth_above_ceiling_rejected() {
        let config = EngineConfig {
            max_recursion_depth: 3,
            default_recursion_depth: 4,
            default_path_depth: 2,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(StrandError::Config(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_recursion_depth": 12}"#).expect("parse");
        assert_eq!(config.max_recursion_depth, 12);
        assert_eq!(config.default_recursion_depth, DEFAULT_RECURSION_DEPTH);
    }
}
