//! Lifecycle phases.
//!
//! Every part moves through the same ordered phases. A part cannot enter a
//! phase until all earlier phases have completed for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Pull,
  Build,
  Stage,
  Prime,
}

impl Phase {
  /// All phases in execution order.
  pub const ALL: [Phase; 4] = [Phase::Pull, Phase::Build, Phase::Stage, Phase::Prime];

  pub fn as_str(self) -> &'static str {
    match self {
      Phase::Pull => "pull",
      Phase::Build => "build",
      Phase::Stage => "stage",
      Phase::Prime => "prime",
    }
  }

  /// Phases from `pull` up to and including `self`.
  pub fn up_to(self) -> impl Iterator<Item = Phase> {
    Self::ALL.into_iter().filter(move |p| *p <= self)
  }

  /// `self` and every later phase.
  pub fn and_later(self) -> impl Iterator<Item = Phase> {
    Self::ALL.into_iter().filter(move |p| *p >= self)
  }

  /// The phase immediately before this one.
  pub fn previous(self) -> Option<Phase> {
    match self {
      Phase::Pull => None,
      Phase::Build => Some(Phase::Pull),
      Phase::Stage => Some(Phase::Build),
      Phase::Prime => Some(Phase::Stage),
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown phase '{0}' (expected pull, build, stage, prime or snap)")]
pub struct ParsePhaseError(pub String);

impl FromStr for Phase {
  type Err = ParsePhaseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pull" => Ok(Phase::Pull),
      "build" => Ok(Phase::Build),
      "stage" => Ok(Phase::Stage),
      "prime" | "snap" => Ok(Phase::Prime),
      other => Err(ParsePhaseError(other.to_string())),
    }
  }
}
