//! Test utilities for snapforge-lib.
//!
//! `TestPart` gives plugin tests a throwaway part directory tree, and
//! `RecordingPlugin` lets lifecycle tests observe which hooks ran.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::ExecuteConfig;
use crate::part::{PartDef, PartDirs};
use crate::phase::Phase;
use crate::plugin::{OptionSpec, PhaseContext, Plugin, PluginError, PluginRegistry, ResolvedOptions, Schema};
use crate::project::Project;

/// A part rooted in a temporary project directory.
pub struct TestPart {
  temp: TempDir,
  name: String,
  pub dirs: PartDirs,
  options: ResolvedOptions,
  config: ExecuteConfig,
}

impl TestPart {
  pub fn new(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let dirs = PartDirs::new(&temp.path().join("parts"), name);
    for dir in [&dirs.src, &dirs.build, &dirs.install, &dirs.state] {
      fs::create_dir_all(dir).unwrap();
    }
    Self {
      temp,
      name: name.to_string(),
      dirs,
      options: ResolvedOptions::default(),
      config: ExecuteConfig::with_jobs(2, false),
    }
  }

  /// Replace the options with a raw JSON object. No schema is applied.
  pub fn with_options(mut self, options: Value) -> Self {
    let map: BTreeMap<String, Value> = serde_json::from_value(options).unwrap();
    self.options = ResolvedOptions::from(map);
    self
  }

  pub fn ctx(&self) -> PhaseContext<'_> {
    PhaseContext {
      part: &self.name,
      options: &self.options,
      dirs: &self.dirs,
      project_dir: self.temp.path(),
      config: &self.config,
    }
  }

  /// The project directory the part lives in.
  pub fn root(&self) -> &Path {
    self.temp.path()
  }
}

/// Write a tarball with the given `(path, content)` members. Names ending
/// in `.gz` or `.tgz` are gzip-compressed.
pub fn write_tarball(path: &Path, entries: &[(&str, &str)]) {
  let name = path.to_string_lossy();
  let file = fs::File::create(path).unwrap();
  let writer: Box<dyn Write> = if name.ends_with(".gz") || name.ends_with(".tgz") {
    Box::new(GzEncoder::new(file, Compression::default()))
  } else {
    Box::new(file)
  };

  let mut builder = tar::Builder::new(writer);
  for (member, content) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, member, content.as_bytes()).unwrap();
  }
  // Dropping the boxed encoder flushes the gzip trailer.
  builder.into_inner().unwrap().flush().unwrap();
}

/// Shared log of `(part, phase)` hook invocations.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
  calls: Arc<Mutex<Vec<(String, Phase)>>>,
}

impl Recorder {
  pub fn calls(&self) -> Vec<(String, Phase)> {
    self.calls.lock().unwrap().clone()
  }

  pub fn clear(&self) {
    self.calls.lock().unwrap().clear();
  }

  pub fn count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  /// Position of the first invocation of `phase` for `part`.
  pub fn position(&self, part: &str, phase: Phase) -> Option<usize> {
    self.calls().iter().position(|(p, ph)| p == part && *ph == phase)
  }

  pub fn ran(&self, part: &str, phase: Phase) -> bool {
    self.position(part, phase).is_some()
  }

  fn push(&self, part: &str, phase: Phase) {
    self.calls.lock().unwrap().push((part.to_string(), phase));
  }
}

/// Option listing `path=content` files the build writes into `install/`.
pub const FILES_OPTION: &str = "files";

/// Option naming a phase whose hook should fail.
pub const FAIL_OPTION: &str = "fail-in";

/// Plugin recording every hook call. Its build writes the `files` option
/// into `install/`.
pub struct RecordingPlugin {
  name: &'static str,
  dependency_phase: Phase,
  recorder: Recorder,
}

impl RecordingPlugin {
  pub fn new(recorder: &Recorder) -> Self {
    Self {
      name: "recording",
      dependency_phase: Phase::Stage,
      recorder: recorder.clone(),
    }
  }

  /// Variant registered as `recording-pull` that only needs dependencies pulled.
  pub fn pull_only(recorder: &Recorder) -> Self {
    Self {
      name: "recording-pull",
      dependency_phase: Phase::Pull,
      recorder: recorder.clone(),
    }
  }

  fn record(&self, phase: Phase, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    self.recorder.push(ctx.part, phase);
    if ctx.options.str(FAIL_OPTION) == Some(phase.as_str()) {
      return Err(PluginError::CmdFailed {
        cmd: format!("recording {phase}"),
        code: Some(1),
      });
    }
    Ok(())
  }
}

impl Plugin for RecordingPlugin {
  fn name(&self) -> &'static str {
    self.name
  }

  fn schema(&self) -> Schema {
    Schema::base()
      .with(FILES_OPTION, OptionSpec::string_array())
      .with(FAIL_OPTION, OptionSpec::string())
  }

  fn dependency_phase(&self) -> Phase {
    self.dependency_phase
  }

  fn pull(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    self.record(Phase::Pull, ctx)?;
    crate::plugin::source::pull_source(ctx)
  }

  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    self.record(Phase::Build, ctx)?;
    for entry in ctx.options.strings(FILES_OPTION) {
      let (path, content) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
      let target = ctx.dirs.install.join(path);
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::write(target, content)?;
    }
    Ok(())
  }

  fn stage(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    self.record(Phase::Stage, ctx)
  }

  fn prime(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    self.record(Phase::Prime, ctx)
  }
}

/// Built-in plugins plus both recording variants.
pub fn recording_registry(recorder: &Recorder) -> PluginRegistry {
  let mut registry = PluginRegistry::with_builtins();
  registry.register(Arc::new(RecordingPlugin::new(recorder)));
  registry.register(Arc::new(RecordingPlugin::pull_only(recorder)));
  registry
}

/// A recording part writing `files` into its install directory.
pub fn recording_part(files: &[&str]) -> PartDef {
  PartDef::new("recording").option(FILES_OPTION, files.iter().map(|f| f.to_string()).collect::<Vec<_>>())
}

/// Build a project in `dir` from `(name, def)` pairs.
pub fn project(dir: &Path, recorder: &Recorder, defs: Vec<(&str, PartDef)>) -> Project {
  let defs = defs.into_iter().map(|(name, def)| (name.to_string(), def)).collect();
  Project::from_defs(dir, None, defs, &recording_registry(recorder)).unwrap()
}
