//! snapforge-lib: Core types and logic for snapforge
//!
//! This crate drives independently defined parts through the
//! pull → build → stage → prime lifecycle:
//! - `Plugin`: adapters translating part options into build tool invocations
//! - `Project`: the ordered, validated set of parts
//! - `Lifecycle`: ordering, incremental execution and cleaning of parts
//! - `merge`: conflict-checked merging into the shared stage and prime trees

pub mod config;
pub mod consts;
pub mod lifecycle;
pub mod lock;
pub mod merge;
pub mod part;
pub mod phase;
pub mod plugin;
pub mod project;
pub mod state;
pub mod util;

pub use config::{ConfigError, ExecuteConfig};
pub use lifecycle::{ExecuteOptions, ExecutionReport, Lifecycle, LifecycleError};
pub use phase::Phase;
pub use project::Project;
