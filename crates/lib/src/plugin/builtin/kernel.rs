//! Plugin building a kernel image, its modules and a modules initrd.
//!
//! Configuration is done the kbuild way; on top of that the plugin installs
//! modules, generates `initrd-mods-<release>` from the modules listed in
//! `kernel-initrd-modules` (plus their dependencies) and copies the image and
//! `System.map` into the install directory, suffixed with the release.

use std::fs;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::plugin::cmd;
use crate::plugin::{OptionSpec, PhaseContext, Plugin, PluginError, ResolvedOptions, Schema};

use super::kbuild::{self, kbuild_schema, path_arg};

const IMAGE_TARGET: &str = "kernel-image-target";
const INITRD_MODULES: &str = "kernel-initrd-modules";
const INITRD_COMPRESSION: &str = "kernel-initrd-compression";
const IMAGE_PATH: &str = "kernel-image-path";

#[derive(Debug, Clone, Copy, Default)]
pub struct KernelPlugin;

impl KernelPlugin {
  fn kernel_release(ctx: &PhaseContext<'_>) -> Result<String, PluginError> {
    let path = ctx.dirs.build.join("include/config/kernel.release");
    let release = fs::read_to_string(&path)
      .map_err(|_| PluginError::MissingArtifact(path.display().to_string()))?
      .trim()
      .to_string();

    if release.is_empty() {
      return Err(PluginError::MissingArtifact(format!(
        "no kernel release found in {}",
        path.display()
      )));
    }
    Ok(release)
  }

  fn make_initrd(ctx: &PhaseContext<'_>, release: &str) -> Result<(), PluginError> {
    info!(part = %ctx.part, release = %release, "generating modules initrd");
    let install = &ctx.dirs.install;
    let modules_root = format!("lib/modules/{release}");

    let mut argv = vec![
      "modprobe".to_string(),
      "-n".to_string(),
      "--show-depends".to_string(),
      "-d".to_string(),
      path_arg(install),
      "-S".to_string(),
      release.to_string(),
    ];
    argv.extend(ctx.options.strings(INITRD_MODULES));
    let depends = cmd::run_output(ctx, &argv, install)?;

    let mut members: Vec<String> = depends
      .lines()
      .filter_map(|line| line.rfind(&modules_root).map(|idx| line[idx..].trim().to_string()))
      .collect();
    members.push(format!("{modules_root}/modules.dep"));
    members.push(format!("{modules_root}/modules.dep.bin"));
    debug!(members = ?members, "initrd members");

    let mut list = members.join("\n");
    list.push('\n');
    let archive = cmd::run_with_input(ctx, ["cpio", "-o"], install, list.as_bytes())?;

    let target = install.join(format!("initrd-mods-{release}"));
    match ctx.options.str(INITRD_COMPRESSION).unwrap_or("gz") {
      "none" => fs::write(&target, &archive)?,
      _ => {
        let mut encoder = GzEncoder::new(fs::File::create(&target)?, Compression::default());
        encoder.write_all(&archive)?;
        encoder.finish()?;
      }
    }
    Ok(())
  }

  fn copy_image(ctx: &PhaseContext<'_>, release: &str) -> Result<(), PluginError> {
    let image = match ctx.options.str(IMAGE_PATH) {
      Some(path) => ctx.dirs.build.join(path),
      None => ctx.dirs.build.join(ctx.options.str(IMAGE_TARGET).unwrap_or("bzImage")),
    };
    if !image.is_file() {
      return Err(PluginError::MissingArtifact(format!("kernel image {}", image.display())));
    }
    fs::copy(&image, ctx.dirs.install.join(format!("vmlinuz-{release}")))?;

    let system_map = ctx.dirs.build.join("System.map");
    if !system_map.is_file() {
      return Err(PluginError::MissingArtifact(system_map.display().to_string()));
    }
    fs::copy(&system_map, ctx.dirs.install.join(format!("System.map-{release}")))?;
    Ok(())
  }
}

impl Plugin for KernelPlugin {
  fn name(&self) -> &'static str {
    "kernel"
  }

  fn schema(&self) -> Schema {
    kbuild_schema()
      .with(IMAGE_TARGET, OptionSpec::string().default_value("bzImage"))
      .with(INITRD_MODULES, OptionSpec::string_array().unique())
      .with(
        INITRD_COMPRESSION,
        OptionSpec::string().one_of(&["none", "gz"]).default_value("gz"),
      )
      .with(IMAGE_PATH, OptionSpec::string())
  }

  fn build_packages(&self, _options: &ResolvedOptions) -> Vec<String> {
    vec!["make".to_string(), "kmod".to_string(), "cpio".to_string()]
  }

  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    let image_target = ctx.options.str(IMAGE_TARGET).unwrap_or("bzImage").to_string();

    kbuild::configure(ctx)?;
    kbuild::make(ctx, &[image_target, "modules".to_string()])?;
    kbuild::make_install(
      ctx,
      &[
        "modules_install".to_string(),
        format!("INSTALL_MOD_PATH={}", path_arg(&ctx.dirs.install)),
      ],
    )?;

    let release = Self::kernel_release(ctx)?;
    Self::make_initrd(ctx, &release)?;
    Self::copy_image(ctx, &release)
  }
}
