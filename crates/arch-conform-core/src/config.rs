//! Configuration types for arch-conform.

use crate::types::Severity;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration (`arch-conform.toml`).
///
/// Declarative `[[rule]]` tables live in the same file; they are read by
/// [`crate::declarative::load_rules_from_toml`] and ignored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Severity threshold for test failure (default: error).
    /// Violations at or above this severity cause `check!()` to fail.
    #[serde(default)]
    pub fail_on: Option<Severity>,

    /// Where the symbol graph comes from.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Per-rule overrides, keyed by rule name.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.rules
            .get(rule_name)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_name: &str) -> Option<Severity> {
        self.rules.get(rule_name).and_then(|c| c.severity)
    }

    /// Returns the failure threshold, defaulting to [`Severity::Error`].
    #[must_use]
    pub fn fail_on(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Error)
    }
}

/// Symbol graph source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Path of the JSON graph, relative to the project root.
    #[serde(default = "default_graph_path")]
    pub path: PathBuf,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: default_graph_path(),
        }
    }
}

fn default_graph_path() -> PathBuf {
    PathBuf::from("target/arch-conform/symbols.json")
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluate rules in parallel.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Global deadline for one evaluation run, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl EvaluationConfig {
    /// Returns the deadline as a duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            timeout_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(arch_conform::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(code(arch_conform::config::parse))]
    Parse {
        /// Parse error message.
        message: String,
    },
}
