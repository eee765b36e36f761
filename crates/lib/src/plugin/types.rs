//! Types passed to and returned from plugin hooks.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ExecuteConfig;
use crate::part::PartDirs;

use super::schema::ResolvedOptions;

/// Everything a hook needs to do its work for one part.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
  pub part: &'a str,
  pub options: &'a ResolvedOptions,
  pub dirs: &'a PartDirs,
  /// Directory holding the project file; relative paths in options resolve here.
  pub project_dir: &'a Path,
  pub config: &'a ExecuteConfig,
}

impl PhaseContext<'_> {
  /// Resolve a path given in an option against the project directory.
  pub fn project_path(&self, value: &str) -> PathBuf {
    self.project_dir.join(value)
  }

  /// `-jN` flag for tools that accept one.
  pub fn jobs_flag(&self) -> String {
    format!("-j{}", self.config.jobs)
  }
}

/// Errors raised by plugin hooks.
#[derive(Debug, Error)]
pub enum PluginError {
  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// Command could not be started.
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] io::Error),

  #[error("unsupported source '{0}': only local directories and tarballs are supported")]
  UnsupportedSource(String),

  /// A file the build was expected to produce is missing.
  #[error("missing build artifact: {0}")]
  MissingArtifact(String),
}
