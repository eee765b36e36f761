//! The lifecycle engine.
//!
//! Drives parts through pull, build, stage and prime:
//!
//! 1. Resolve the requested parts (all parts when none are named).
//! 2. Order them together with their dependencies into waves.
//! 3. For every part and phase, skip the phase if its fingerprint matches
//!    the stored record and nothing upstream ran in this invocation;
//!    otherwise invalidate it and later phases, run it and record success.
//!
//! Execution is sequential and stops at the first failure. Phases that
//! completed before the failure keep their records.

mod dag;
mod fingerprint;
mod types;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::time::Instant;

use tracing::{debug, info};

pub use dag::PartGraph;
pub use types::{ExecuteOptions, ExecutionReport, LifecycleError, PartStatus, PhaseRun, PhaseState, PhaseStatus};

use fingerprint::Fingerprints;

use crate::config::{ConfigError, ExecuteConfig};
use crate::merge::{self, SharedTree};
use crate::part::{Part, PartDirs};
use crate::phase::Phase;
use crate::plugin::PluginError;
use crate::project::Project;
use crate::state::StateStore;
use crate::util::fs::{copy_tree, remove_path, reset_dir};
use crate::util::hash::Fingerprint;

/// Runs lifecycle phases for the parts of one project.
pub struct Lifecycle {
  project: Project,
  config: ExecuteConfig,
  state: StateStore,
}

impl Lifecycle {
  pub fn new(project: Project, config: ExecuteConfig) -> Self {
    let state = StateStore::new(&project.paths().parts);
    Self { project, config, state }
  }

  pub fn project(&self) -> &Project {
    &self.project
  }

  pub fn state(&self) -> &StateStore {
    &self.state
  }

  /// Declaration indices of `requested`, or of every part if empty.
  fn resolve_parts(&self, requested: &[String]) -> Result<Vec<usize>, ConfigError> {
    if requested.is_empty() {
      return Ok((0..self.project.parts().len()).collect());
    }

    let mut resolved = Vec::with_capacity(requested.len());
    for name in requested {
      let idx = self
        .project
        .index_of(name)
        .ok_or_else(|| ConfigError::UnknownPart(name.clone()))?;
      if !resolved.contains(&idx) {
        resolved.push(idx);
      }
    }
    Ok(resolved)
  }

  /// Parts to run and the phase each runs up to, in execution order.
  fn plan(&self, graph: &PartGraph, target: Phase, requested: &[usize]) -> Vec<(usize, Phase)> {
    if target == Phase::Pull {
      let mut parts = requested.to_vec();
      parts.sort_unstable();
      return parts.into_iter().map(|idx| (idx, Phase::Pull)).collect();
    }

    let mut required: BTreeMap<usize, Phase> = requested.iter().map(|&idx| (idx, target)).collect();

    // Dependents come before their dependencies in reversed wave order.
    for idx in graph.waves().into_iter().flatten().rev() {
      let Some(&phase) = required.get(&idx) else {
        continue;
      };
      if phase < Phase::Build {
        continue;
      }
      let dep_phase = self.project.parts()[idx].plugin().dependency_phase();
      for dep in graph.dependencies(idx) {
        let entry = required.entry(dep).or_insert(dep_phase);
        *entry = (*entry).max(dep_phase);
      }
    }

    let members: BTreeSet<usize> = required.keys().copied().collect();
    graph
      .waves_of(&members)
      .into_iter()
      .flatten()
      .filter_map(|idx| required.get(&idx).map(|&phase| (idx, phase)))
      .collect()
  }

  /// Run `requested` parts (all when empty) up to `target`.
  pub fn execute(
    &self,
    target: Phase,
    requested: &[String],
    options: &ExecuteOptions,
  ) -> Result<ExecutionReport, LifecycleError> {
    let started = Instant::now();
    let graph = PartGraph::new(&self.project)?;
    let requested = self.resolve_parts(requested)?;
    let plan = self.plan(&graph, target, &requested);
    info!(target = %target, parts = plan.len(), "executing lifecycle");

    if let Some(from) = options.force_from {
      for &idx in &requested {
        let name = self.project.parts()[idx].name();
        info!(part = %name, phase = %from, "forcing re-run");
        self.state.invalidate_from(name, from)?;
      }
    }

    let mut fingerprints = Fingerprints::new(&self.project, &graph);
    let mut ran: HashSet<(usize, Phase)> = HashSet::new();
    let mut report = ExecutionReport::default();

    for (idx, part_target) in plan {
      let part = &self.project.parts()[idx];
      let dep_phase = part.plugin().dependency_phase();
      let mut earlier_ran = false;

      for phase in part_target.up_to() {
        let fingerprint = fingerprints.get(idx, phase)?;
        let dependency_ran =
          phase == Phase::Build && graph.dependencies(idx).iter().any(|&dep| ran.contains(&(dep, dep_phase)));

        if !earlier_ran && !dependency_ran && self.state.is_up_to_date(part.name(), phase, &fingerprint) {
          debug!(part = %part.name(), phase = %phase, "up to date, skipping");
          report.skipped.push(PhaseRun::new(part.name(), phase));
          continue;
        }

        self.state.invalidate_from(part.name(), phase)?;
        info!(part = %part.name(), phase = %phase, "running phase");
        self.run_phase(part, phase)?;
        self.state.record_success(part.name(), phase, &fingerprint)?;

        ran.insert((idx, phase));
        earlier_ran = true;
        report.executed.push(PhaseRun::new(part.name(), phase));
      }
    }

    info!(
      target = %target,
      executed = report.executed.len(),
      skipped = report.skipped.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "lifecycle complete"
    );
    Ok(report)
  }

  fn run_phase(&self, part: &Part, phase: Phase) -> Result<(), LifecycleError> {
    let ctx = part.context(self.project.dir(), &self.config);
    let dirs = part.dirs();
    let phase_err = |source: PluginError| LifecycleError::Phase {
      part: part.name().to_string(),
      phase,
      source,
    };

    match phase {
      Phase::Pull => {
        fs::create_dir_all(&dirs.src).map_err(|e| phase_err(e.into()))?;
        part.plugin().pull(&ctx).map_err(phase_err)
      }
      Phase::Build => {
        prepare_build(dirs).map_err(|e| phase_err(e.into()))?;
        part.plugin().build(&ctx).map_err(phase_err)
      }
      Phase::Stage | Phase::Prime => {
        fs::create_dir_all(&dirs.install).map_err(|e| phase_err(e.into()))?;
        part.plugin().run_phase(phase, &ctx).map_err(phase_err)?;

        let Some(tree) = SharedTree::for_phase(phase, self.project.paths()) else {
          return Ok(());
        };
        let merge_err = |source| LifecycleError::Merge {
          part: part.name().to_string(),
          phase,
          source,
        };
        merge::unmerge(part.name(), &tree).map_err(merge_err)?;
        merge::merge(part.name(), &dirs.install, &tree).map_err(merge_err)?;
        Ok(())
      }
    }
  }

  /// Undo `requested` parts (all when empty) back to before `from`.
  ///
  /// Removes prime and stage contributions, build and install directories
  /// and pulled sources as far back as `from`. Returns the cleaned part names.
  pub fn clean(&self, requested: &[String], from: Phase) -> Result<Vec<String>, LifecycleError> {
    let parts = self.resolve_parts(requested)?;
    let mut cleaned = Vec::with_capacity(parts.len());

    for idx in parts.into_iter().rev() {
      let part = &self.project.parts()[idx];
      info!(part = %part.name(), from = %from, "cleaning");
      self.state.invalidate_from(part.name(), from)?;

      let phases: Vec<Phase> = from.and_later().collect();
      for phase in phases.into_iter().rev() {
        self.clean_phase(part, phase)?;
      }
      if from == Phase::Pull {
        remove_dir_for_clean(&part.dirs().root)?;
      }
      cleaned.push(part.name().to_string());
    }

    cleaned.reverse();
    Ok(cleaned)
  }

  fn clean_phase(&self, part: &Part, phase: Phase) -> Result<(), LifecycleError> {
    let dirs = part.dirs();
    match phase {
      Phase::Prime | Phase::Stage => {
        if let Some(tree) = SharedTree::for_phase(phase, self.project.paths()) {
          merge::unmerge(part.name(), &tree).map_err(|source| LifecycleError::Merge {
            part: part.name().to_string(),
            phase,
            source,
          })?;
        }
        Ok(())
      }
      Phase::Build => {
        remove_dir_for_clean(&dirs.build)?;
        remove_dir_for_clean(&dirs.install)
      }
      Phase::Pull => remove_dir_for_clean(&dirs.src),
    }
  }

  /// Current fingerprint of `phase` for the part called `part`.
  pub fn fingerprint(&self, part: &str, phase: Phase) -> Result<Fingerprint, LifecycleError> {
    let graph = PartGraph::new(&self.project)?;
    let idx = self
      .project
      .index_of(part)
      .ok_or_else(|| ConfigError::UnknownPart(part.to_string()))?;
    Ok(Fingerprints::new(&self.project, &graph).get(idx, phase)?)
  }

  /// Per part and phase: done, stale or pending.
  pub fn status(&self) -> Result<Vec<PartStatus>, LifecycleError> {
    let graph = PartGraph::new(&self.project)?;
    let mut fingerprints = Fingerprints::new(&self.project, &graph);

    let mut statuses = Vec::with_capacity(self.project.parts().len());
    for (idx, part) in self.project.parts().iter().enumerate() {
      let mut phases = Vec::with_capacity(Phase::ALL.len());
      for phase in Phase::ALL {
        let fingerprint = fingerprints.get(idx, phase)?;
        let record = self.state.load_lenient(part.name(), phase);
        let state = match &record {
          None => PhaseState::Pending,
          Some(r) if r.fingerprint == fingerprint => PhaseState::Done,
          Some(_) => PhaseState::Stale,
        };
        phases.push(PhaseStatus {
          phase,
          state,
          fingerprint,
          completed_at_unix: record.map(|r| r.completed_at_unix),
        });
      }

      statuses.push(PartStatus {
        name: part.name().to_string(),
        plugin: part.plugin().name().to_string(),
        after: part.after().to_vec(),
        build_packages: part.build_packages(),
        phases,
      });
    }
    Ok(statuses)
  }
}

/// Reset `build/` to a copy of `src/` and empty `install/`.
fn prepare_build(dirs: &PartDirs) -> std::io::Result<()> {
  reset_dir(&dirs.build)?;
  if dirs.src.is_dir() {
    copy_tree(&dirs.src, &dirs.build)?;
  }
  reset_dir(&dirs.install)
}

fn remove_dir_for_clean(path: &std::path::Path) -> Result<(), LifecycleError> {
  remove_path(path).map_err(|source| LifecycleError::Clean {
    path: path.to_path_buf(),
    source,
  })
}
