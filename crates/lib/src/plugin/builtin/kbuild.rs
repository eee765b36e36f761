//! Plugin for kbuild-based projects (busybox, the kernel, …).
//!
//! The base `.config` comes from `make <kdefconfig>` or, when set, a copy
//! of `kconfigfile`. Entries from `kconfigs` are then forced into it and
//! `make oldconfig` resolves the dependent symbols with their defaults.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::plugin::cmd;
use crate::plugin::kconfig::patch_config;
use crate::plugin::{OptionSpec, PhaseContext, Plugin, PluginError, ResolvedOptions, Schema};

pub(crate) const KDEFCONFIG: &str = "kdefconfig";
pub(crate) const KCONFIGFILE: &str = "kconfigfile";
pub(crate) const KCONFIGS: &str = "kconfigs";

/// Newlines fed to `make oldconfig`, accepting the default for every prompt.
const OLDCONFIG_ANSWERS: usize = 1 << 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct KBuildPlugin;

/// Schema shared by kbuild and the plugins built on it.
pub(crate) fn kbuild_schema() -> Schema {
  Schema::base()
    .with(KDEFCONFIG, OptionSpec::string().default_value("defconfig"))
    .with(KCONFIGFILE, OptionSpec::string())
    .with(KCONFIGS, OptionSpec::string_array().unique().min_items(1))
}

fn verbose_flags(ctx: &PhaseContext<'_>) -> Vec<String> {
  if ctx.config.verbose {
    vec!["V=1".to_string()]
  } else {
    Vec::new()
  }
}

/// Produce the final `.config` in the build directory.
pub(crate) fn configure(ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
  let build_dir = &ctx.dirs.build;
  let config_path = build_dir.join(".config");

  match ctx.options.str(KCONFIGFILE) {
    Some(file) => {
      info!(part = %ctx.part, config = %file, "using provided kconfig file");
      fs::copy(ctx.project_path(file), &config_path)?;
    }
    None => {
      let defconfig = ctx.options.str(KDEFCONFIG).unwrap_or("defconfig");
      let mut argv = vec!["make".to_string(), defconfig.to_string()];
      argv.extend(verbose_flags(ctx));
      cmd::run(ctx, &argv, build_dir)?;
    }
  }

  patch_config(&config_path, &ctx.options.strings(KCONFIGS))?;

  let mut argv = vec!["make".to_string(), "oldconfig".to_string()];
  argv.extend(verbose_flags(ctx));
  cmd::run_with_input(ctx, &argv, build_dir, &vec![b'\n'; OLDCONFIG_ANSWERS])?;
  Ok(())
}

/// `make -jN [V=1] <targets>` in the build directory.
pub(crate) fn make(ctx: &PhaseContext<'_>, targets: &[String]) -> Result<(), PluginError> {
  let mut argv = vec!["make".to_string(), ctx.jobs_flag()];
  argv.extend(verbose_flags(ctx));
  argv.extend(targets.iter().cloned());
  cmd::run(ctx, &argv, &ctx.dirs.build)
}

/// `make CONFIG_PREFIX=<install> -jN [V=1] <targets>` in the build directory.
pub(crate) fn make_install(ctx: &PhaseContext<'_>, targets: &[String]) -> Result<(), PluginError> {
  let mut argv = vec![
    "make".to_string(),
    format!("CONFIG_PREFIX={}", path_arg(&ctx.dirs.install)),
    ctx.jobs_flag(),
  ];
  argv.extend(verbose_flags(ctx));
  argv.extend(targets.iter().cloned());
  cmd::run(ctx, &argv, &ctx.dirs.build)
}

pub(crate) fn path_arg(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

impl Plugin for KBuildPlugin {
  fn name(&self) -> &'static str {
    "kbuild"
  }

  fn schema(&self) -> Schema {
    kbuild_schema()
  }

  fn build_packages(&self, _options: &ResolvedOptions) -> Vec<String> {
    vec!["make".to_string()]
  }

  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    configure(ctx)?;
    make(ctx, &[])?;
    make_install(ctx, &["install".to_string()])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ConfigError;
  use crate::util::testutil::TestPart;
  use serde_json::json;

  #[test]
  fn schema_defaults() {
    let resolved = kbuild_schema().validate("busybox", &Default::default()).unwrap();
    assert_eq!(resolved.str(KDEFCONFIG), Some("defconfig"));
    assert_eq!(resolved.str(KCONFIGFILE), None);
    assert!(resolved.strings(KCONFIGS).is_empty());
  }

  #[test]
  fn schema_rejects_duplicate_kconfigs() {
    let raw = serde_json::from_value(json!({"kconfigs": ["CONFIG_X=y", "CONFIG_X=y"]})).unwrap();
    assert!(kbuild_schema().validate("busybox", &raw).is_err());
  }

  #[test]
  fn schema_rejects_empty_kconfigs() {
    let raw = serde_json::from_value(json!({"kconfigs": []})).unwrap();
    let err = kbuild_schema().validate("busybox", &raw).unwrap_err();
    assert!(matches!(err, ConfigError::TooFewItems { min: 1, .. }));
  }

  #[test]
  fn needs_make() {
    assert_eq!(KBuildPlugin.build_packages(&Default::default()), vec!["make".to_string()]);
  }

  #[test]
  fn missing_kconfigfile_fails_build() {
    let part = TestPart::new("busybox")
      .with_options(json!({"kconfigfile": "does-not-exist.config", "kconfigs": []}));
    // Copying the missing config file fails before any make invocation
    let err = KBuildPlugin.build(&part.ctx()).unwrap_err();
    assert!(matches!(err, PluginError::Io(_)));
  }
}
