//! Implementation of the `status` command.
//!
//! Shows, for every part, whether each phase is done, stale or pending.

use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use snapforge_lib::consts::APP_NAME;
use snapforge_lib::lifecycle::{PartStatus, PhaseState, PhaseStatus};
use snapforge_lib::lock::{LockMode, ProjectLock};
use snapforge_lib::{ExecuteConfig, Lifecycle, Project};

use crate::output::{OutputFormat, print_info, print_json, print_stat, truncate_hash};

pub fn cmd_status(project_dir: &Path, output: OutputFormat, config: ExecuteConfig) -> Result<()> {
  let verbose = config.verbose;
  let project = Project::load(project_dir).context("Failed to load project")?;
  let _lock = ProjectLock::acquire(&project.paths().parts, LockMode::Shared, &format!("{APP_NAME} status"))
    .context("Failed to acquire project lock")?;

  let statuses = Lifecycle::new(project, config).status()?;

  if output.is_json() {
    return print_json(&statuses);
  }

  if statuses.is_empty() {
    print_info("No parts defined");
    return Ok(());
  }

  for (i, part) in statuses.iter().enumerate() {
    if i > 0 {
      println!();
    }
    print_part(part, verbose);
  }
  Ok(())
}

fn print_part(part: &PartStatus, verbose: bool) {
  println!(
    "{} {}",
    part.name.if_supports_color(Stream::Stdout, |s| s.bold()),
    format!("({})", part.plugin).if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
  if !part.after.is_empty() {
    print_stat("After", &part.after.join(", "));
  }
  if !part.build_packages.is_empty() {
    print_stat("Build packages", &part.build_packages.join(", "));
  }
  for phase in &part.phases {
    print_stat(phase.phase.as_str(), &describe(phase, verbose));
  }
}

fn describe(phase: &PhaseStatus, verbose: bool) -> String {
  let mut text = match phase.state {
    PhaseState::Done => "done".if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    PhaseState::Stale => "stale".if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    PhaseState::Pending => "pending".to_string(),
  };

  if let Some(secs) = phase.completed_at_unix {
    let at = UNIX_EPOCH + Duration::from_secs(secs);
    text.push_str(&format!(" (completed {})", humantime::format_rfc3339_seconds(at)));
  }
  if verbose {
    text.push_str(&format!(" [{}]", truncate_hash(&phase.fingerprint.0)));
  }
  text
}
