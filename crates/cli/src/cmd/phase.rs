//! Implementation of the `pull`, `build`, `stage` and `prime` commands.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use snapforge_lib::consts::APP_NAME;
use snapforge_lib::lock::{LockMode, ProjectLock};
use snapforge_lib::{ExecuteConfig, ExecuteOptions, Lifecycle, Phase, Project};

use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success, symbols};

/// Run every requested part (all when `parts` is empty) up to `target`.
///
/// Holds the exclusive project lock for the duration of the run.
pub fn cmd_phase(
  project_dir: &Path,
  target: Phase,
  parts: &[String],
  force_from: Option<Phase>,
  output: OutputFormat,
  config: ExecuteConfig,
) -> Result<()> {
  let start = Instant::now();
  let verbose = config.verbose;

  let project = Project::load(project_dir).context("Failed to load project")?;
  let _lock = ProjectLock::acquire(&project.paths().parts, LockMode::Exclusive, &format!("{APP_NAME} {target}"))
    .context("Failed to acquire project lock")?;

  let lifecycle = Lifecycle::new(project, config);
  let report = lifecycle.execute(target, parts, &ExecuteOptions { force_from })?;

  if output.is_json() {
    return print_json(&report);
  }

  for run in &report.executed {
    println!("  {} {} {}", symbols::PLUS, run.phase, run.part);
  }
  if verbose {
    for run in &report.skipped {
      println!("  {} {} {} (up to date)", symbols::INFO, run.phase, run.part);
    }
  }

  println!();
  if report.executed.is_empty() {
    print_info(&format!("Nothing to {target}: everything is up to date"));
  } else {
    print_success(&format!("{} complete", capitalize(target.as_str())));
  }
  print_stat("Phases run", &report.executed.len().to_string());
  print_stat("Phases skipped", &report.skipped.len().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
