//! Fingerprints of phase inputs.
//!
//! - pull: plugin identity and pull options
//! - build: plugin identity, build options, the pull fingerprint and each
//!   dependency's fingerprint at the phase the plugin requires
//! - stage: the build fingerprint
//! - prime: the stage fingerprint
//!
//! Options not marked as pull options count as build options.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::consts::STATE_FORMAT_VERSION;
use crate::phase::Phase;
use crate::project::Project;
use crate::util::hash::{Fingerprint, Fingerprintable, HashError};

use super::dag::PartGraph;

#[derive(Debug, Serialize)]
struct PhaseInputs<'a> {
  format: u32,
  phase: Phase,
  plugin: &'a str,
  plugin_version: u32,
  options: BTreeMap<&'a str, &'a Value>,
  previous: Option<Fingerprint>,
  dependencies: BTreeMap<&'a str, Fingerprint>,
}

impl Fingerprintable for PhaseInputs<'_> {}

/// Memoizing fingerprint calculator for one project.
pub struct Fingerprints<'a> {
  project: &'a Project,
  graph: &'a PartGraph,
  cache: HashMap<(usize, Phase), Fingerprint>,
}

impl<'a> Fingerprints<'a> {
  /// `graph` must have been built from `project`.
  pub fn new(project: &'a Project, graph: &'a PartGraph) -> Self {
    Self {
      project,
      graph,
      cache: HashMap::new(),
    }
  }

  pub fn get(&mut self, idx: usize, phase: Phase) -> Result<Fingerprint, HashError> {
    if let Some(cached) = self.cache.get(&(idx, phase)) {
      return Ok(cached.clone());
    }

    let project = self.project;
    let part = &project.parts()[idx];
    let previous = match phase.previous() {
      Some(prev) => Some(self.get(idx, prev)?),
      None => None,
    };

    let mut dependencies = BTreeMap::new();
    if phase == Phase::Build {
      let dep_phase = part.plugin().dependency_phase();
      for dep in self.graph.dependencies(idx) {
        let fingerprint = self.get(dep, dep_phase)?;
        dependencies.insert(project.parts()[dep].name(), fingerprint);
      }
    }

    let options = match phase {
      Phase::Pull | Phase::Build => part.options_for(phase),
      Phase::Stage | Phase::Prime => BTreeMap::new(),
    };

    let fingerprint = PhaseInputs {
      format: STATE_FORMAT_VERSION,
      phase,
      plugin: part.plugin().name(),
      plugin_version: part.plugin().version(),
      options,
      previous,
      dependencies,
    }
    .compute_fingerprint()?;

    self.cache.insert((idx, phase), fingerprint.clone());
    Ok(fingerprint)
  }
}
