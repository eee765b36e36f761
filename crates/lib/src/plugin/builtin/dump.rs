//! Plugins that install their source tree as-is.

use tracing::debug;

use crate::plugin::schema::SOURCE_OPTION;
use crate::plugin::{OptionSpec, PhaseContext, Plugin, PluginError, Schema};
use crate::util::fs::copy_tree;

/// Copies the build tree into the install directory.
///
/// Registered twice: `dump` takes any (or no) source, `tar` requires one.
#[derive(Debug, Clone, Copy)]
pub struct DumpPlugin {
  name: &'static str,
  source_required: bool,
}

impl DumpPlugin {
  pub fn dump() -> Self {
    Self {
      name: "dump",
      source_required: false,
    }
  }

  pub fn tar() -> Self {
    Self {
      name: "tar",
      source_required: true,
    }
  }
}

impl Plugin for DumpPlugin {
  fn name(&self) -> &'static str {
    self.name
  }

  fn schema(&self) -> Schema {
    if self.source_required {
      Schema::base().with(SOURCE_OPTION, OptionSpec::string().required().pull())
    } else {
      Schema::base()
    }
  }

  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    debug!(part = %ctx.part, "copying build tree to install directory");
    copy_tree(&ctx.dirs.build, &ctx.dirs.install)?;
    Ok(())
  }
}
