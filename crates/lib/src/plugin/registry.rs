//! Lookup of plugins by the name used in project files.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::Plugin;
use super::builtin;

/// Registered plugins keyed by [`Plugin::name`].
#[derive(Clone, Default)]
pub struct PluginRegistry {
  plugins: BTreeMap<&'static str, Arc<dyn Plugin>>,
}

impl PluginRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding every built-in plugin.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    for plugin in builtin::all() {
      registry.register(plugin);
    }
    registry
  }

  /// Register `plugin`, replacing any plugin with the same name.
  pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Option<Arc<dyn Plugin>> {
    let name = plugin.name();
    debug!(plugin = name, "registering plugin");
    self.plugins.insert(name, plugin)
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
    self.plugins.get(name).cloned()
  }

  pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.plugins.keys().copied()
  }
}

impl std::fmt::Debug for PluginRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PluginRegistry").field("plugins", &self.plugins.keys()).finish()
  }
}
