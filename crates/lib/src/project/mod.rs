//! Projects: the ordered set of parts plus the shared directory layout.
//!
//! # Layout
//!
//! ```text
//! <project>/
//! ├── snapforge.yaml
//! ├── parts/
//! │   ├── .index/{stage,prime}.json   # ownership of files in the shared trees
//! │   ├── .lock
//! │   └── <name>/{src,build,install,state}/
//! ├── stage/
//! └── prime/
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::consts::{INDEX_DIR, PARTS_DIR, PRIME_DIR, PROJECT_FILENAME, STAGE_DIR};
use crate::part::{Part, PartDef};
use crate::plugin::PluginRegistry;

/// Paths of the shared project directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
  pub root: PathBuf,
  pub parts: PathBuf,
  pub stage: PathBuf,
  pub prime: PathBuf,
  pub index: PathBuf,
}

impl ProjectPaths {
  pub fn new(root: &Path) -> Self {
    let parts = root.join(PARTS_DIR);
    Self {
      root: root.to_path_buf(),
      index: parts.join(INDEX_DIR),
      stage: root.join(STAGE_DIR),
      prime: root.join(PRIME_DIR),
      parts,
    }
  }
}

/// On-disk project descriptor. Keys other than these (packaging metadata)
/// are ignored.
#[derive(Debug, Deserialize)]
struct ProjectFile {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  parts: serde_yaml::Mapping,
}

/// A loaded project with validated parts in declaration order.
#[derive(Debug, Clone)]
pub struct Project {
  name: Option<String>,
  paths: ProjectPaths,
  parts: Vec<Part>,
}

impl Project {
  /// Load `snapforge.yaml` from `dir` using the built-in plugins.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    Self::load_with(dir, &PluginRegistry::with_builtins())
  }

  /// Load `snapforge.yaml` from `dir` resolving plugins through `registry`.
  pub fn load_with(dir: &Path, registry: &PluginRegistry) -> Result<Self, ConfigError> {
    let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let path = dir.join(PROJECT_FILENAME);
    info!(path = %path.display(), "loading project");

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadProject {
      path: path.clone(),
      source,
    })?;
    Self::from_yaml(&dir, &content, registry).map_err(|e| match e {
      ConfigError::ParseProject { source, .. } => ConfigError::ParseProject { path, source },
      other => other,
    })
  }

  /// Parse a project descriptor, keeping the declaration order of parts.
  pub fn from_yaml(dir: &Path, content: &str, registry: &PluginRegistry) -> Result<Self, ConfigError> {
    let file: ProjectFile = serde_yaml::from_str(content).map_err(|source| ConfigError::ParseProject {
      path: dir.join(PROJECT_FILENAME),
      source,
    })?;

    let mut defs = Vec::with_capacity(file.parts.len());
    for (key, value) in file.parts {
      let name: String = serde_yaml::from_value(key.clone()).map_err(|source| ConfigError::ParsePart {
        part: format!("{key:?}"),
        source,
      })?;
      let def: PartDef = serde_yaml::from_value(value).map_err(|source| ConfigError::ParsePart {
        part: name.clone(),
        source,
      })?;
      defs.push((name, def));
    }

    Self::from_defs(dir, file.name, defs, registry)
  }

  /// Build a project from already-parsed part definitions.
  ///
  /// Checks names are unique and dependencies exist. Dependency cycles are
  /// reported when the lifecycle runs.
  pub fn from_defs(
    dir: &Path,
    name: Option<String>,
    defs: Vec<(String, PartDef)>,
    registry: &PluginRegistry,
  ) -> Result<Self, ConfigError> {
    let paths = ProjectPaths::new(dir);

    let mut seen = HashSet::new();
    for (part_name, _) in &defs {
      if !seen.insert(part_name.as_str()) {
        return Err(ConfigError::DuplicatePart(part_name.clone()));
      }
    }

    for (part_name, def) in &defs {
      if let Some(missing) = def.after.iter().find(|dep| !seen.contains(dep.as_str())) {
        return Err(ConfigError::UnknownDependency {
          part: part_name.clone(),
          dependency: missing.clone(),
        });
      }
    }

    let parts = defs
      .iter()
      .map(|(part_name, def)| Part::new(part_name, def, registry, &paths.parts))
      .collect::<Result<Vec<_>, _>>()?;

    debug!(part_count = parts.len(), "project parts validated");
    Ok(Self { name, paths, parts })
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn dir(&self) -> &Path {
    &self.paths.root
  }

  pub fn paths(&self) -> &ProjectPaths {
    &self.paths
  }

  /// Parts in declaration order.
  pub fn parts(&self) -> &[Part] {
    &self.parts
  }

  /// Declaration index of the part called `name`.
  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.parts.iter().position(|p| p.name() == name)
  }

  pub fn part(&self, name: &str) -> Option<&Part> {
    self.parts.iter().find(|p| p.name() == name)
  }
}
