//! Kconfig helpers shared by the kbuild-style plugins.

use std::fs;
use std::io;
use std::path::Path;

/// Force `kconfigs` into the `.config` at `config_path`.
///
/// The overrides are written both before and after the existing content;
/// different kbuild versions honour either the first or the last
/// occurrence of a symbol during `oldconfig`.
pub fn patch_config(config_path: &Path, kconfigs: &[String]) -> io::Result<()> {
  let overrides = kconfigs.join("\n");
  let current = fs::read_to_string(config_path)?;
  let patched = format!("{overrides}\n\n{current}\n\n{overrides}");
  fs::write(config_path, patched)
}
