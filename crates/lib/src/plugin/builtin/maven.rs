//! Plugin for Maven projects.
//!
//! Runs `mvn package` and installs the produced jars under `jar/` and wars
//! under `war/`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::plugin::cmd;
use crate::plugin::{OptionSpec, PhaseContext, Plugin, PluginError, ResolvedOptions, Schema};

const MAVEN_OPTIONS: &str = "maven-options";

#[derive(Debug, Clone, Copy, Default)]
pub struct MavenPlugin;

fn artifacts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PluginError> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let mut found: Vec<PathBuf> = fs::read_dir(dir)?
    .filter_map(Result::ok)
    .map(|e| e.path())
    .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == extension))
    .collect();
  found.sort();
  Ok(found)
}

fn install_into(files: &[PathBuf], dir: &Path) -> Result<(), PluginError> {
  if files.is_empty() {
    return Ok(());
  }
  fs::create_dir_all(dir)?;
  for file in files {
    if let Some(name) = file.file_name() {
      fs::copy(file, dir.join(name))?;
    }
  }
  Ok(())
}

impl Plugin for MavenPlugin {
  fn name(&self) -> &'static str {
    "maven"
  }

  fn schema(&self) -> Schema {
    Schema::base().with(MAVEN_OPTIONS, OptionSpec::string_array().unique().min_items(1))
  }

  fn build_packages(&self, _options: &ResolvedOptions) -> Vec<String> {
    vec!["maven".to_string(), "default-jdk-headless".to_string()]
  }

  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    let mut argv = vec!["mvn".to_string(), "package".to_string()];
    argv.extend(ctx.options.strings(MAVEN_OPTIONS));
    cmd::run(ctx, &argv, &ctx.dirs.build)?;
    collect_artifacts(ctx)
  }
}

fn collect_artifacts(ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
  let target = ctx.dirs.build.join("target");
  let jars = artifacts(&target, "jar")?;
  let wars = artifacts(&target, "war")?;

  if jars.is_empty() && wars.is_empty() {
    return Err(PluginError::MissingArtifact(format!(
      "no jar or war files in {}",
      target.display()
    )));
  }

  install_into(&jars, &ctx.dirs.install.join("jar"))?;
  install_into(&wars, &ctx.dirs.install.join("war"))
}
