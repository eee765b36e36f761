//! Implementation of the `clean` command.

use std::path::Path;

use anyhow::{Context, Result};

use snapforge_lib::consts::APP_NAME;
use snapforge_lib::lock::{LockMode, ProjectLock};
use snapforge_lib::{ExecuteConfig, Lifecycle, Phase, Project};

use crate::output::{print_info, print_success};

pub fn cmd_clean(project_dir: &Path, parts: &[String], step: Phase, config: ExecuteConfig) -> Result<()> {
  let project = Project::load(project_dir).context("Failed to load project")?;
  let _lock = ProjectLock::acquire(&project.paths().parts, LockMode::Exclusive, &format!("{APP_NAME} clean"))
    .context("Failed to acquire project lock")?;

  let cleaned = Lifecycle::new(project, config).clean(parts, step)?;

  if cleaned.is_empty() {
    print_info("No parts to clean");
  }
  for part in cleaned {
    print_success(&format!("Cleaned {part} from {step}"));
  }
  Ok(())
}
