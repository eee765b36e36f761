//! Filesystem helpers shared by the engine, the merge resolver and plugins.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Remove `path` if it exists and recreate it as an empty directory.
pub fn reset_dir(path: &Path) -> io::Result<()> {
  remove_path(path)?;
  fs::create_dir_all(path)
}

/// Remove a file, symlink or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
  let metadata = match path.symlink_metadata() {
    Ok(m) => m,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };

  if metadata.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}

/// Copy the contents of `src` into `dst`, recreating directories and symlinks.
///
/// Existing files in `dst` are overwritten; files that only exist in `dst`
/// are left alone.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
  fs::create_dir_all(dst)?;

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dst.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target)?;
    } else if file_type.is_symlink() {
      let link = fs::read_link(entry.path())?;
      remove_path(&target)?;
      create_symlink(&link, &target)?;
    } else if file_type.is_file() {
      if target.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(&target)?;
      }
      fs::copy(entry.path(), &target)?;
    }
  }

  Ok(())
}

/// Write `content` to `path` via a sibling temp file and rename, so readers
/// never observe a partial file.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  temp_name.push(".tmp");
  let temp_path = path.with_file_name(temp_name);

  fs::write(&temp_path, content)?;
  fs::rename(&temp_path, path)
}

/// Create a symlink at `link` pointing at `target`.
pub fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
  #[cfg(unix)]
  {
    std::os::unix::fs::symlink(target, link)
  }
  #[cfg(windows)]
  {
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    if resolved.is_dir() {
      std::os::windows::fs::symlink_dir(target, link)
    } else {
      std::os::windows::fs::symlink_file(target, link)
    }
  }
}
