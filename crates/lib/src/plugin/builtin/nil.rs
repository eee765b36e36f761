use crate::plugin::{PhaseContext, Plugin, PluginError, Schema};

/// A plugin that builds nothing. Useful for parts that only pull sources
/// or only exist to order other parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilPlugin;

impl Plugin for NilPlugin {
  fn name(&self) -> &'static str {
    "nil"
  }

  fn schema(&self) -> Schema {
    Schema::base()
  }

  fn build(&self, _ctx: &PhaseContext<'_>) -> Result<(), PluginError> {
    Ok(())
  }
}
