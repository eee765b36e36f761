//! Execution configuration and configuration errors.
//!
//! `ExecuteConfig` is threaded explicitly from the engine into every plugin
//! hook; there is no process-wide build state.

use std::path::PathBuf;

use thiserror::Error;

/// Settings that influence how plugins invoke their external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteConfig {
  /// Worker count handed to build tools that support it (`make -jN`).
  pub jobs: usize,

  /// Ask build tools for verbose output.
  pub verbose: bool,
}

impl ExecuteConfig {
  /// Build a config from a requested job count, where 0 means "cpu count + 1".
  pub fn with_jobs(requested: usize, verbose: bool) -> Self {
    let jobs = if requested == 0 { num_cpus() + 1 } else { requested };
    Self { jobs, verbose }
  }
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self::with_jobs(0, false)
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Errors in the project or part configuration.
///
/// All of these are raised before any phase runs.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read project file {path}: {source}")]
  ReadProject {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse project file {path}: {source}")]
  ParseProject {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid definition for part '{part}': {source}")]
  ParsePart {
    part: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid part name '{0}': names must be non-empty and may not contain '/' or start with '.'")]
  InvalidPartName(String),

  #[error("part '{0}' is defined more than once")]
  DuplicatePart(String),

  #[error("unknown part '{0}'")]
  UnknownPart(String),

  #[error("part '{part}' depends on unknown part '{dependency}'")]
  UnknownDependency { part: String, dependency: String },

  #[error("part '{part}' uses unknown plugin '{plugin}'")]
  UnknownPlugin { part: String, plugin: String },

  #[error("part '{part}': unknown option '{option}'")]
  UnknownOption { part: String, option: String },

  #[error("part '{part}': missing required option '{option}'")]
  MissingOption { part: String, option: String },

  #[error("part '{part}': option '{option}' must be {expected}")]
  InvalidType {
    part: String,
    option: String,
    expected: &'static str,
  },

  #[error("part '{part}': option '{option}' must be one of {allowed:?}, got '{value}'")]
  NotAllowed {
    part: String,
    option: String,
    value: String,
    allowed: Vec<String>,
  },

  #[error("part '{part}': option '{option}' contains duplicate item '{item}'")]
  DuplicateItem { part: String, option: String, item: String },

  #[error("part '{part}': option '{option}' needs at least {min} item(s)")]
  TooFewItems { part: String, option: String, min: usize },

  #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
  DependencyCycle { cycle: Vec<String> },
}
