//! Types for lifecycle execution.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::merge::MergeError;
use crate::phase::Phase;
use crate::plugin::PluginError;
use crate::state::StateError;
use crate::util::hash::{Fingerprint, HashError};

/// Errors that abort an execution.
#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// A plugin hook or the engine's preparation for it failed.
  #[error("failed to {phase} part '{part}': {source}")]
  Phase {
    part: String,
    phase: Phase,
    #[source]
    source: PluginError,
  },

  #[error("failed to {phase} part '{part}': {source}")]
  Merge {
    part: String,
    phase: Phase,
    #[source]
    source: MergeError,
  },

  #[error(transparent)]
  State(#[from] StateError),

  #[error("failed to compute fingerprint: {0}")]
  Fingerprint(#[from] HashError),

  #[error("failed to clean {path}: {source}")]
  Clean {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Options for a single [`execute`](super::Lifecycle::execute) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
  /// Re-run requested parts from this phase on, even if up to date.
  pub force_from: Option<Phase>,
}

/// One phase of one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRun {
  pub part: String,
  pub phase: Phase,
}

impl PhaseRun {
  pub fn new(part: &str, phase: Phase) -> Self {
    Self {
      part: part.to_string(),
      phase,
    }
  }
}

/// What an execution did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
  pub executed: Vec<PhaseRun>,
  pub skipped: Vec<PhaseRun>,
}

impl ExecutionReport {
  pub fn was_executed(&self, part: &str, phase: Phase) -> bool {
    self.executed.iter().any(|r| r.part == part && r.phase == phase)
  }

  pub fn was_skipped(&self, part: &str, phase: Phase) -> bool {
    self.skipped.iter().any(|r| r.part == part && r.phase == phase)
  }
}

/// Condition of one phase of one part, as reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
  /// Completed with the current inputs.
  Done,
  /// Completed, but inputs changed since.
  Stale,
  /// Never completed, or invalidated.
  Pending,
}

impl std::fmt::Display for PhaseState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      PhaseState::Done => "done",
      PhaseState::Stale => "stale",
      PhaseState::Pending => "pending",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseStatus {
  pub phase: Phase,
  pub state: PhaseState,
  pub fingerprint: Fingerprint,
  pub completed_at_unix: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartStatus {
  pub name: String,
  pub plugin: String,
  pub after: Vec<String>,
  pub build_packages: Vec<String>,
  pub phases: Vec<PhaseStatus>,
}

impl PartStatus {
  pub fn phase(&self, phase: Phase) -> Option<&PhaseStatus> {
    self.phases.iter().find(|p| p.phase == phase)
  }
}
