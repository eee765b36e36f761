//! Merging part install directories into the shared stage and prime trees.
//!
//! The resolver is the only writer of those trees. Every regular file,
//! symlink and directory it places is recorded in an [`OwnershipIndex`] so a
//! part's contribution can later be removed without touching anybody else's
//! files.
//!
//! Two parts may ship the same path only if the content is identical; the
//! path is then co-owned. All conflicts, non-UTF-8 names and unsupported file
//! types are found before anything is written.

mod index;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use index::OwnershipIndex;

use crate::phase::Phase;
use crate::project::ProjectPaths;
use crate::util::fs::{create_symlink, remove_path};
use crate::util::hash::hash_file;

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("part '{part}' conflicts with part '{other}' at '{path}': contents differ")]
  Conflict { path: String, part: String, other: String },

  #[error("part '{part}' installs '{}': file names must be valid UTF-8", .path.display())]
  InvalidPath { part: String, path: PathBuf },

  #[error("part '{part}' installs '{}': only regular files, symlinks and directories can be merged", .path.display())]
  UnsupportedFileType { part: String, path: PathBuf },

  #[error("ownership index {path} is corrupt: {source}")]
  Index {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> MergeError + '_ {
  move |source| MergeError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// A shared output tree and the location of its ownership index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedTree {
  name: &'static str,
  root: PathBuf,
  index_path: PathBuf,
}

impl SharedTree {
  pub fn new(name: &'static str, root: &Path, index_dir: &Path) -> Self {
    Self {
      name,
      root: root.to_path_buf(),
      index_path: index_dir.join(format!("{name}.json")),
    }
  }

  pub fn stage(paths: &ProjectPaths) -> Self {
    Self::new("stage", &paths.stage, &paths.index)
  }

  pub fn prime(paths: &ProjectPaths) -> Self {
    Self::new("prime", &paths.prime, &paths.index)
  }

  /// The tree `phase` merges into, if any.
  pub fn for_phase(phase: Phase, paths: &ProjectPaths) -> Option<Self> {
    match phase {
      Phase::Stage => Some(Self::stage(paths)),
      Phase::Prime => Some(Self::prime(paths)),
      Phase::Pull | Phase::Build => None,
    }
  }

  pub fn name(&self) -> &str {
    self.name
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn index_path(&self) -> &Path {
    &self.index_path
  }

  /// Current ownership index of the tree.
  pub fn index(&self) -> Result<OwnershipIndex, MergeError> {
    OwnershipIndex::load(&self.index_path)
  }
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
  /// Files and symlinks written into the tree.
  pub written: usize,
  /// Identical paths already provided by another part.
  pub shared: usize,
}

/// What an unmerge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnmergeReport {
  /// Paths deleted from the tree.
  pub removed: usize,
  /// Co-owned paths left in place for their other owners.
  pub released: usize,
}

enum EntryKind {
  File,
  Symlink(PathBuf),
}

enum Action {
  Write,
  Share,
}

struct Planned {
  rel: String,
  source: PathBuf,
  dest: PathBuf,
  kind: EntryKind,
  action: Action,
}

struct PlannedDir {
  rel: String,
  dest: PathBuf,
}

/// Everything a merge will do, worked out before the tree is touched.
#[derive(Default)]
struct Plan {
  dirs: Vec<PlannedDir>,
  entries: Vec<Planned>,
}

/// Index key for `rel`, or `None` if a component is not valid UTF-8.
fn rel_key(rel: &Path) -> Option<String> {
  let components = rel
    .components()
    .map(|c| c.as_os_str().to_str())
    .collect::<Option<Vec<_>>>()?;
  Some(components.join("/"))
}

/// A part other than `part` owning `rel`, if any.
fn foreign_owner(index: &OwnershipIndex, rel: &str, part: &str) -> Option<String> {
  index.owners(rel)?.iter().find(|owner| *owner != part).cloned()
}

/// A part other than `part` owning something below the directory `rel`.
fn foreign_owner_below(index: &OwnershipIndex, rel: &str, part: &str) -> Option<String> {
  let prefix = format!("{rel}/");
  index
    .paths_owned_by_others(part)
    .into_iter()
    .find(|(path, _)| path.starts_with(&prefix))
    .map(|(_, owner)| owner)
}

/// True if `dest` already holds exactly what `source` would put there.
fn same_content(source: &Path, kind: &EntryKind, dest: &Path) -> Result<bool, MergeError> {
  let Ok(meta) = dest.symlink_metadata() else {
    return Ok(false);
  };

  match kind {
    EntryKind::Symlink(target) => {
      if !meta.file_type().is_symlink() {
        return Ok(false);
      }
      let existing = fs::read_link(dest).map_err(io_err(dest))?;
      Ok(existing == *target)
    }
    EntryKind::File => {
      if !meta.is_file() || meta.len() != source.metadata().map_err(io_err(source))?.len() {
        return Ok(false);
      }
      let ours = hash_file(source).map_err(io_err(source))?;
      let theirs = hash_file(dest).map_err(io_err(dest))?;
      Ok(ours == theirs)
    }
  }
}

/// Merge the contents of `source_dir` into `tree` on behalf of `part`.
///
/// On conflict nothing is written and the first conflicting path is
/// returned; every conflict is logged.
pub fn merge(part: &str, source_dir: &Path, tree: &SharedTree) -> Result<MergeReport, MergeError> {
  info!(part = %part, tree = tree.name, source = %source_dir.display(), "merging");
  let mut index = tree.index()?;
  let plan = plan_merge(part, source_dir, tree, &index)?;
  apply_plan(part, tree, plan, &mut index)
}

fn plan_merge(part: &str, source_dir: &Path, tree: &SharedTree, index: &OwnershipIndex) -> Result<Plan, MergeError> {
  let mut plan = Plan::default();
  let mut conflicts = Vec::new();

  if !source_dir.is_dir() {
    return Ok(plan);
  }

  for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| MergeError::Io {
      path: e.path().unwrap_or(source_dir).to_path_buf(),
      source: e.into(),
    })?;
    let rel_path = entry.path().strip_prefix(source_dir).map_err(|e| MergeError::Io {
      path: entry.path().to_path_buf(),
      source: io::Error::other(e),
    })?;
    let rel = rel_key(rel_path).ok_or_else(|| MergeError::InvalidPath {
      part: part.to_string(),
      path: rel_path.to_path_buf(),
    })?;
    let dest = tree.root.join(rel_path);
    let dest_meta = dest.symlink_metadata().ok();
    let file_type = entry.file_type();

    if file_type.is_dir() {
      if dest_meta.as_ref().is_some_and(|m| !m.is_dir())
        && let Some(other) = foreign_owner(index, &rel, part)
      {
        conflicts.push((rel, other));
        continue;
      }
      plan.dirs.push(PlannedDir { rel, dest });
      continue;
    }

    let kind = if file_type.is_symlink() {
      EntryKind::Symlink(fs::read_link(entry.path()).map_err(io_err(entry.path()))?)
    } else if file_type.is_file() {
      EntryKind::File
    } else {
      return Err(MergeError::UnsupportedFileType {
        part: part.to_string(),
        path: rel_path.to_path_buf(),
      });
    };

    if dest_meta.as_ref().is_some_and(|m| m.is_dir())
      && let Some(other) = foreign_owner_below(index, &rel, part)
    {
      conflicts.push((rel, other));
      continue;
    }

    let action = match foreign_owner(index, &rel, part) {
      None => Action::Write,
      Some(_) if dest_meta.is_none() => Action::Write,
      Some(other) => {
        if same_content(entry.path(), &kind, &dest)? {
          Action::Share
        } else {
          conflicts.push((rel, other));
          continue;
        }
      }
    };

    plan.entries.push(Planned {
      rel,
      source: entry.path().to_path_buf(),
      dest,
      kind,
      action,
    });
  }

  if let Some((path, other)) = conflicts.first().cloned() {
    for (path, other) in &conflicts {
      warn!(part = %part, other = %other, path = %path, tree = tree.name, "merge conflict");
    }
    return Err(MergeError::Conflict {
      path,
      part: part.to_string(),
      other,
    });
  }

  Ok(plan)
}

/// Carry out `plan` and persist the index.
///
/// The index is saved even when a write fails, so every path already placed
/// in the tree keeps its owner.
fn apply_plan(part: &str, tree: &SharedTree, plan: Plan, index: &mut OwnershipIndex) -> Result<MergeReport, MergeError> {
  let applied = write_plan(part, tree, plan, index);
  let saved = index.save(&tree.index_path);
  let report = applied?;
  saved?;

  info!(
    part = %part,
    tree = tree.name,
    written = report.written,
    shared = report.shared,
    "merge complete"
  );
  Ok(report)
}

fn write_plan(part: &str, tree: &SharedTree, plan: Plan, index: &mut OwnershipIndex) -> Result<MergeReport, MergeError> {
  fs::create_dir_all(&tree.root).map_err(io_err(&tree.root))?;
  for dir in &plan.dirs {
    if dir.dest.symlink_metadata().is_ok_and(|m| !m.is_dir()) {
      remove_path(&dir.dest).map_err(io_err(&dir.dest))?;
    }
    fs::create_dir_all(&dir.dest).map_err(io_err(&dir.dest))?;
    index.add_dir_owner(&dir.rel, part);
  }

  let mut report = MergeReport::default();
  for item in plan.entries {
    match item.action {
      Action::Share => {
        debug!(part = %part, path = %item.rel, "sharing identical path");
        report.shared += 1;
      }
      Action::Write => {
        let dest = &item.dest;
        if let Some(parent) = dest.parent() {
          fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        remove_path(dest).map_err(io_err(dest))?;
        match &item.kind {
          EntryKind::File => {
            fs::copy(&item.source, dest).map_err(io_err(dest))?;
          }
          EntryKind::Symlink(target) => create_symlink(target, dest).map_err(io_err(dest))?,
        }
        report.written += 1;
      }
    }
    index.add_owner(&item.rel, part);
  }
  Ok(report)
}

/// Remove everything `part` contributed to `tree`.
///
/// Paths only `part` owns are deleted, directories it shipped that end up
/// empty are removed and emptied parents are pruned. Co-owned paths stay in
/// place for their remaining owners.
pub fn unmerge(part: &str, tree: &SharedTree) -> Result<UnmergeReport, MergeError> {
  let mut index = tree.index()?;
  let mut report = UnmergeReport::default();
  if !index.has_part(part) {
    return Ok(report);
  }

  for rel in index.paths_owned_by(part) {
    if index.remove_owner(&rel, part) {
      let dest = tree.root.join(&rel);
      remove_path(&dest).map_err(io_err(&dest))?;
      prune_empty_parents(&tree.root, &dest, &index);
      report.removed += 1;
    } else {
      report.released += 1;
    }
  }

  for rel in index.release_dirs(part) {
    let dest = tree.root.join(&rel);
    if fs::remove_dir(&dest).is_ok() {
      debug!(part = %part, path = %rel, "removed empty directory");
      prune_empty_parents(&tree.root, &dest, &index);
    }
  }

  index.save(&tree.index_path)?;
  info!(
    part = %part,
    tree = tree.name,
    removed = report.removed,
    released = report.released,
    "unmerged"
  );
  Ok(report)
}

/// Remove empty directories from `path`'s parent up to (excluding) `root`,
/// stopping at directories some part still ships.
fn prune_empty_parents(root: &Path, path: &Path, index: &OwnershipIndex) {
  let mut current = path.parent();
  while let Some(dir) = current {
    if dir == root || !dir.starts_with(root) {
      break;
    }
    let owned = dir
      .strip_prefix(root)
      .ok()
      .and_then(rel_key)
      .is_some_and(|rel| index.is_owned_dir(&rel));
    if owned || fs::remove_dir(dir).is_err() {
      break;
    }
    current = dir.parent();
  }
}
