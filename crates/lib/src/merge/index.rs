//! Persisted `path → owning parts` index for one shared tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::MergeError;
use crate::consts::STATE_FORMAT_VERSION;
use crate::util::fs::write_atomic;

/// Ownership of every regular file, symlink and directory a part placed in a
/// shared tree.
///
/// Keys are tree-relative UTF-8 paths with `/` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipIndex {
  version: u32,
  owners: BTreeMap<String, BTreeSet<String>>,
  #[serde(default)]
  dirs: BTreeMap<String, BTreeSet<String>>,
}

impl OwnershipIndex {
  /// Load the index at `path`; a missing file is an empty index.
  pub fn load(path: &Path) -> Result<Self, MergeError> {
    let content = match fs::read_to_string(path) {
      Ok(c) => c,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Ok(Self {
          version: STATE_FORMAT_VERSION,
          owners: BTreeMap::new(),
          dirs: BTreeMap::new(),
        });
      }
      Err(source) => {
        return Err(MergeError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let index: Self = serde_json::from_str(&content).map_err(|source| MergeError::Index {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), entries = index.owners.len(), "ownership index loaded");
    Ok(index)
  }

  pub fn save(&self, path: &Path) -> Result<(), MergeError> {
    let content = serde_json::to_string_pretty(self).map_err(|source| MergeError::Index {
      path: path.to_path_buf(),
      source,
    })?;
    write_atomic(path, content.as_bytes()).map_err(|source| MergeError::Io {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn owners(&self, rel: &str) -> Option<&BTreeSet<String>> {
    self.owners.get(rel).filter(|set| !set.is_empty())
  }

  pub fn add_owner(&mut self, rel: &str, part: &str) {
    self.owners.entry(rel.to_string()).or_default().insert(part.to_string());
  }

  /// Drop `part` from `rel`. Returns true when nobody owns `rel` any more.
  pub fn remove_owner(&mut self, rel: &str, part: &str) -> bool {
    let Some(set) = self.owners.get_mut(rel) else {
      return true;
    };
    set.remove(part);
    if set.is_empty() {
      self.owners.remove(rel);
      true
    } else {
      false
    }
  }

  /// Paths `part` owns, alone or together with other parts.
  pub fn paths_owned_by(&self, part: &str) -> Vec<String> {
    self
      .owners
      .iter()
      .filter(|(_, set)| set.contains(part))
      .map(|(path, _)| path.clone())
      .collect()
  }

  /// `(path, owner)` pairs for paths owned by some part other than `part`.
  pub fn paths_owned_by_others(&self, part: &str) -> Vec<(String, String)> {
    self
      .owners
      .iter()
      .filter_map(|(path, set)| set.iter().find(|owner| *owner != part).map(|o| (path.clone(), o.clone())))
      .collect()
  }

  pub fn add_dir_owner(&mut self, rel: &str, part: &str) {
    self.dirs.entry(rel.to_string()).or_default().insert(part.to_string());
  }

  pub fn is_owned_dir(&self, rel: &str) -> bool {
    self.dirs.get(rel).is_some_and(|set| !set.is_empty())
  }

  /// Drop `part` from every directory it shipped.
  ///
  /// Returns the directories nobody owns any more, deepest first.
  pub fn release_dirs(&mut self, part: &str) -> Vec<String> {
    let mut freed = Vec::new();
    self.dirs.retain(|rel, set| {
      if set.remove(part) && set.is_empty() {
        freed.push(rel.clone());
      }
      !set.is_empty()
    });
    freed.reverse();
    freed
  }

  /// True if `part` owns any path or directory.
  pub fn has_part(&self, part: &str) -> bool {
    self.owners.values().chain(self.dirs.values()).any(|set| set.contains(part))
  }
}
