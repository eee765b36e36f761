//! Plugins shipped with snapforge.

mod dump;
mod kbuild;
mod kernel;
mod maven;
mod nil;

use std::sync::Arc;

use super::Plugin;

pub use dump::DumpPlugin;
pub use kbuild::KBuildPlugin;
pub use kernel::KernelPlugin;
pub use maven::MavenPlugin;
pub use nil::NilPlugin;

/// Every built-in plugin.
pub fn all() -> Vec<Arc<dyn Plugin>> {
  vec![
    Arc::new(NilPlugin),
    Arc::new(DumpPlugin::dump()),
    Arc::new(DumpPlugin::tar()),
    Arc::new(KBuildPlugin),
    Arc::new(KernelPlugin),
    Arc::new(MavenPlugin),
  ]
}
