//! # Application Configuration
//!
//! Settings for the binary, read from an optional TOML file and then
//! overridden by `STRAND_*` environment variables.
//!
//! ```toml
//! events = "graph.jsonl"
//! actor = "ingest-bot"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! api_key = "secret"
//! cors_origins = ["https://app.example.com"]
//!
//! [engine]
//! max_recursion_depth = 50
//! default_path_depth = 6
//! ```
//!
//! ## Environment Overrides
//!
//! - `STRAND_EVENTS`: event log path
//! - `STRAND_ACTOR`: actor recorded on new facts that do not name one
//! - `STRAND_HOST`, `STRAND_PORT`: bind address
//! - `STRAND_API_KEY`: bearer key; empty disables authentication
//! - `STRAND_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `STRAND_BODY_LIMIT`: request body limit in bytes
//! - `STRAND_MAX_RECURSION_DEPTH`: REC depth ceiling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strand_core::{EngineConfig, StrandError};

/// Event log used when neither the CLI nor the config names one.
pub const DEFAULT_EVENTS_PATH: &str = "strand.jsonl";

/// Default request body limit (2 MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer key required on every route except `/health`.
    pub api_key: Option<String>,
    /// Allowed CORS origins. `None` means localhost only; `["*"]` allows all.
    pub cors_origins: Option<Vec<String>>,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            cors_origins: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub events: Option<PathBuf>,
    pub actor: String,
    pub server: ServerConfig,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            events: None,
            actor: "strand".to_string(),
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (if any), apply process environment overrides and
    /// validate.
    pub fn load(path: Option<&Path>) -> Result<Self, StrandError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, StrandError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StrandError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, StrandError> {
        toml::from_str(text).map_err(|e| StrandError::Config(e.to_string()))
    }

    /// Apply `STRAND_*` overrides looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), StrandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(events) = var("STRAND_EVENTS") {
            self.events = Some(PathBuf::from(events));
        }
        if let Some(actor) = var("STRAND_ACTOR") {
            self.actor = actor;
        }
        if let Some(host) = var("STRAND_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("STRAND_PORT") {
            self.server.port = parse_var("STRAND_PORT", &port)?;
        }
        if let Some(key) = var("STRAND_API_KEY") {
            self.server.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(origins) = var("STRAND_CORS_ORIGINS") {
            self.server.cors_origins = Some(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(limit) = var("STRAND_BODY_LIMIT") {
            self.server.body_limit = parse_var("STRAND_BODY_LIMIT", &limit)?;
        }
        if let Some(depth) = var("STRAND_MAX_RECURSION_DEPTH") {
            self.engine.max_recursion_depth = parse_var("STRAND_MAX_RECURSION_DEPTH", &depth)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), StrandError> {
        if self.actor.trim().is_empty() {
            return Err(StrandError::Config("actor must not be empty".to_string()));
        }
        if self.server.body_limit == 0 {
            return Err(StrandError::Config(
                "server.body_limit must be positive".to_string(),
            ));
        }
        self.engine.validate()
    }

    /// The event log path, preferring an explicit CLI value.
    #[must_use]
    pub fn events_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.events.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EVENTS_PATH))
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, StrandError> {
    value
        .trim()
        .parse()
        .map_err(|_| StrandError::Config(format!("{name}: cannot parse '{value}'")))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.events_path(None), PathBuf::from(DEFAULT_EVENTS_PATH));
    }

    #[test]
    fn toml_sections_are_read() {
        let config = AppConfig::from_toml(
            r#"
            events = "graph.jsonl"

            [server]
            port = 9000
            api_key = "k"

            [engine]
            max_recursion_depth = 20
            default_path_depth = 4
            "#,
        )
        .expect("parse");

        assert_eq!(config.events, Some(PathBuf::from("graph.jsonl")));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.api_key.as_deref(), Some("k"));
        assert_eq!(config.engine.max_recursion_depth, 20);
        assert_eq!(config.engine.default_path_depth, 4);
        config.validate().expect("valid");
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::from_toml("[server]\nport = 9000\n").expect("parse");
        config
            .apply_env(env(&[
                ("STRAND_PORT", "7000"),
                ("STRAND_CORS_ORIGINS", "http://a.test, http://b.test"),
                ("STRAND_API_KEY", ""),
            ]))
            .expect("apply");

        assert_eq!(config.server.port, 7000);
        assert_eq!(
            config.server.cors_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        assert_eq!(config.server.api_key, None);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("STRAND_PORT", "eighty")]))
            .expect_err("bad port");
        assert!(matches!(err, StrandError::Config(_)));
    }

    #[test]
    fn depth_ceiling_cannot_be_raised() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("STRAND_MAX_RECURSION_DEPTH", "1000")]))
            .expect("apply");
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_path_wins() {
        let config = AppConfig {
            events: Some(PathBuf::from("from-config.jsonl")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.events_path(Some(Path::new("cli.jsonl"))),
            PathBuf::from("cli.jsonl")
        );
        assert_eq!(config.events_path(None), PathBuf::from("from-config.jsonl"));
    }
}
