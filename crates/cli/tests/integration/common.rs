//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated project directory.
///
/// Each test gets its own temporary directory holding `snapforge.yaml`,
/// the part sources and every directory the tool writes.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create a project with the given `snapforge.yaml` content.
  pub fn with_project(yaml: &str) -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file("snapforge.yaml", yaml);
    env
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.path(relative_path)).unwrap()
  }

  pub fn exists(&self, relative_path: &str) -> bool {
    self.path(relative_path).exists()
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.dir().join(relative_path)
  }

  pub fn dir(&self) -> &Path {
    self.temp.path()
  }

  /// Command for the snapforge binary pointed at this project.
  pub fn snapforge_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("snapforge");
    cmd.arg("--project-dir").arg(self.dir());
    cmd
  }
}
