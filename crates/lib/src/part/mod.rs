//! Parts: named, configured instances of a plugin.
//!
//! A part owns a private directory tree under `parts/<name>/`:
//!
//! ```text
//! parts/<name>/
//! ├── src/       # pulled sources
//! ├── build/     # working copy the plugin builds in
//! ├── install/   # the part's output, merged into stage/ and prime/
//! └── state/     # one record per completed phase
//! ```
//!
//! Parts do not sequence phases themselves; that is the lifecycle's job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigError, ExecuteConfig};
use crate::consts::{PART_BUILD_DIR, PART_INSTALL_DIR, PART_SRC_DIR, PART_STATE_DIR};
use crate::phase::Phase;
use crate::plugin::{PhaseContext, Plugin, PluginRegistry, ResolvedOptions, Schema};

/// Declarative definition of a part, as written in the project file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartDef {
  pub plugin: String,

  #[serde(default)]
  pub options: BTreeMap<String, Value>,

  /// Parts that must be staged before this part builds.
  #[serde(default)]
  pub after: Vec<String>,
}

impl PartDef {
  pub fn new(plugin: &str) -> Self {
    Self {
      plugin: plugin.to_string(),
      ..Default::default()
    }
  }

  pub fn option(mut self, name: &str, value: impl Into<Value>) -> Self {
    self.options.insert(name.to_string(), value.into());
    self
  }

  pub fn after(mut self, dependency: &str) -> Self {
    self.after.push(dependency.to_string());
    self
  }
}

/// The private directories of a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartDirs {
  pub root: PathBuf,
  pub src: PathBuf,
  pub build: PathBuf,
  pub install: PathBuf,
  pub state: PathBuf,
}

impl PartDirs {
  pub fn new(parts_dir: &Path, name: &str) -> Self {
    let root = parts_dir.join(name);
    Self {
      src: root.join(PART_SRC_DIR),
      build: root.join(PART_BUILD_DIR),
      install: root.join(PART_INSTALL_DIR),
      state: root.join(PART_STATE_DIR),
      root,
    }
  }
}

/// A validated part ready to be driven by the lifecycle.
#[derive(Clone)]
pub struct Part {
  name: String,
  plugin: Arc<dyn Plugin>,
  schema: Schema,
  options: ResolvedOptions,
  after: Vec<String>,
  dirs: PartDirs,
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
  if name.is_empty() || name.starts_with('.') || name.contains('/') || name.contains('\\') {
    return Err(ConfigError::InvalidPartName(name.to_string()));
  }
  Ok(())
}

impl Part {
  /// Resolve the plugin for `def` and validate its options.
  pub fn new(name: &str, def: &PartDef, registry: &PluginRegistry, parts_dir: &Path) -> Result<Self, ConfigError> {
    validate_name(name)?;

    let plugin = registry.get(&def.plugin).ok_or_else(|| ConfigError::UnknownPlugin {
      part: name.to_string(),
      plugin: def.plugin.clone(),
    })?;

    let schema = plugin.schema();
    let options = schema.validate(name, &def.options)?;

    Ok(Self {
      name: name.to_string(),
      plugin,
      schema,
      options,
      after: def.after.clone(),
      dirs: PartDirs::new(parts_dir, name),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn plugin(&self) -> &dyn Plugin {
    self.plugin.as_ref()
  }

  pub fn options(&self) -> &ResolvedOptions {
    &self.options
  }

  /// Names of the parts this part depends on, in declaration order.
  pub fn after(&self) -> &[String] {
    &self.after
  }

  pub fn dirs(&self) -> &PartDirs {
    &self.dirs
  }

  pub fn build_packages(&self) -> Vec<String> {
    self.plugin.build_packages(&self.options)
  }

  /// Resolved options that feed the fingerprint of `phase`.
  pub fn options_for(&self, phase: Phase) -> BTreeMap<&str, &Value> {
    self
      .options
      .iter()
      .filter(|(name, _)| self.schema.phase_of(name) == phase)
      .map(|(name, value)| (name.as_str(), value))
      .collect()
  }

  pub fn context<'a>(&'a self, project_dir: &'a Path, config: &'a ExecuteConfig) -> PhaseContext<'a> {
    PhaseContext {
      part: &self.name,
      options: &self.options,
      dirs: &self.dirs,
      project_dir,
      config,
    }
  }
}

impl fmt::Debug for Part {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Part")
      .field("name", &self.name)
      .field("plugin", &self.plugin.name())
      .field("options", &self.options)
      .field("after", &self.after)
      .field("dirs", &self.dirs)
      .finish()
  }
}
