//! Shared helpers for library integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use snapforge_lib::consts::PROJECT_FILENAME;
use snapforge_lib::{ExecuteConfig, Lifecycle, Project};
use tempfile::TempDir;

/// A project directory in a temporary location.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  /// Create a project whose `snapforge.yaml` holds `yaml`.
  pub fn new(yaml: &str) -> Self {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(PROJECT_FILENAME), yaml).unwrap();
    Self { temp }
  }

  pub fn dir(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Replace the project file.
  pub fn set_project(&self, yaml: &str) {
    fs::write(self.temp.path().join(PROJECT_FILENAME), yaml).unwrap();
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    fs::read_to_string(self.temp.path().join(relative_path)).unwrap()
  }

  pub fn exists(&self, relative_path: &str) -> bool {
    self.temp.path().join(relative_path).exists()
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  pub fn load(&self) -> Project {
    Project::load(self.temp.path()).unwrap()
  }

  /// A lifecycle over the project as currently written on disk.
  pub fn lifecycle(&self) -> Lifecycle {
    Lifecycle::new(self.load(), ExecuteConfig::with_jobs(1, false))
  }
}

/// Write a gzip-compressed tarball with `(path, content)` members.
pub fn write_tgz(path: &Path, entries: &[(&str, &str)]) {
  let file = fs::File::create(path).unwrap();
  let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (member, content) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, member, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap();
}
