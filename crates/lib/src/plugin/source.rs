//! Fetching part sources into `parts/<name>/src`.
//!
//! Supported sources are local directories (copied) and local tarballs
//! (`.tar`, `.tar.gz`, `.tgz`, extracted). When every member of a tarball
//! lives under one top-level directory, that directory is stripped.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::util::fs::{copy_tree, reset_dir};

use super::schema::SOURCE_OPTION;
use super::types::{PhaseContext, PluginError};

/// Populate the part's `src/` directory from its `source` option.
///
/// With no source the directory is simply created.
pub fn pull_source(ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
  let Some(source) = ctx.options.str(SOURCE_OPTION) else {
    fs::create_dir_all(&ctx.dirs.src)?;
    return Ok(());
  };

  if source.contains("://") {
    return Err(PluginError::UnsupportedSource(source.to_string()));
  }

  let path = ctx.project_path(source);
  reset_dir(&ctx.dirs.src)?;

  if path.is_dir() {
    info!(part = %ctx.part, source = %path.display(), "copying local source");
    copy_tree(&path, &ctx.dirs.src)?;
    return Ok(());
  }

  if path.is_file() && is_tarball(&path) {
    info!(part = %ctx.part, source = %path.display(), "extracting tarball");
    extract_tarball(&path, &ctx.dirs.src)?;
    return Ok(());
  }

  Err(PluginError::UnsupportedSource(source.to_string()))
}

fn is_tarball(path: &Path) -> bool {
  let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
  name.ends_with(".tar") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

fn is_gzipped(path: &Path) -> bool {
  let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
  name.ends_with(".gz") || name.ends_with(".tgz")
}

fn open_archive(path: &Path) -> io::Result<tar::Archive<Box<dyn Read>>> {
  let file = File::open(path)?;
  let reader: Box<dyn Read> = if is_gzipped(path) {
    Box::new(GzDecoder::new(file))
  } else {
    Box::new(file)
  };
  Ok(tar::Archive::new(reader))
}

/// Relative member path with `.` components dropped; `None` if it escapes.
fn normalize(path: &Path) -> Option<PathBuf> {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::Normal(c) => out.push(c),
      Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
    }
  }
  Some(out)
}

/// The single top-level directory shared by every member, if there is one.
fn common_top_dir(path: &Path) -> io::Result<Option<PathBuf>> {
  let mut archive = open_archive(path)?;
  let mut tops = BTreeSet::new();

  for entry in archive.entries()? {
    let entry = entry?;
    let Some(member) = normalize(&entry.path()?) else {
      continue;
    };
    let mut components = member.components();
    let Some(first) = components.next() else {
      continue;
    };
    // A plain file at the top level means there is nothing to strip
    if components.next().is_none() && !entry.header().entry_type().is_dir() {
      return Ok(None);
    }
    tops.insert(PathBuf::from(first.as_os_str()));
  }

  if tops.len() == 1 {
    Ok(tops.into_iter().next())
  } else {
    Ok(None)
  }
}

/// Extract `archive_path` into `dest`, stripping a shared top-level directory.
pub fn extract_tarball(archive_path: &Path, dest: &Path) -> io::Result<()> {
  let strip = common_top_dir(archive_path)?;
  let mut archive = open_archive(archive_path)?;
  fs::create_dir_all(dest)?;

  for entry in archive.entries()? {
    let mut entry = entry?;
    let raw = entry.path()?.into_owned();
    let Some(mut member) = normalize(&raw) else {
      warn!(member = %raw.display(), "skipping tarball member outside the archive root");
      continue;
    };

    if let Some(top) = &strip {
      member = member.strip_prefix(top).map(Path::to_path_buf).unwrap_or(member);
    }
    if member.as_os_str().is_empty() {
      continue;
    }

    let target = dest.join(&member);
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent)?;
    }
    entry.unpack(&target)?;
  }

  Ok(())
}
