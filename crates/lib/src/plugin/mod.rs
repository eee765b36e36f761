//! The plugin contract.
//!
//! A plugin adapts one external build system (make, maven, kbuild, …) to the
//! lifecycle. Plugins are flat implementations of [`Plugin`]; behaviour shared
//! between plugins lives in helper functions (`source`, `kconfig`, `cmd`),
//! not in a type hierarchy.

pub mod builtin;
pub mod cmd;
pub mod kconfig;
pub mod registry;
pub mod schema;
pub mod source;
pub mod types;

use crate::phase::Phase;

pub use registry::PluginRegistry;
pub use schema::{OptionSpec, OptionType, ResolvedOptions, Schema};
pub use types::{PhaseContext, PluginError};

/// Capabilities every build-system adapter provides.
///
/// Hooks only touch the part's own directories. Files reach the shared
/// stage and prime trees through the merge resolver, never directly.
pub trait Plugin: Send + Sync {
  /// Plugin identifier as used in project files.
  fn name(&self) -> &'static str;

  /// Bumped when the plugin's behaviour changes in a way that should
  /// invalidate previous builds.
  fn version(&self) -> u32 {
    1
  }

  /// Options the plugin accepts.
  fn schema(&self) -> Schema;

  /// Host packages needed to run this plugin's tools.
  fn build_packages(&self, _options: &ResolvedOptions) -> Vec<String> {
    Vec::new()
  }

  /// Phase each dependency must reach before this plugin's build runs.
  fn dependency_phase(&self) -> Phase {
    Phase::Stage
  }

  /// Fetch sources into `src/`. Defaults to handling the `source` option.
  fn pull(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    source::pull_source(ctx)
  }

  /// Build from `build/` and install into `install/`.
  fn build(&self, ctx: &PhaseContext<'_>) -> Result<(), PluginError>;

  /// Adjust `install/` right before it is merged into the stage tree.
  fn stage(&self, _ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    Ok(())
  }

  /// Adjust `install/` right before it is merged into the prime tree.
  fn prime(&self, _ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    Ok(())
  }

  /// Dispatch to the hook for `phase`.
  fn run_phase(&self, phase: Phase, ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    match phase {
      Phase::Pull => self.pull(ctx),
      Phase::Build => self.build(ctx),
      Phase::Stage => self.stage(ctx),
      Phase::Prime => self.prime(ctx),
    }
  }
}
