mod clean;
mod phase;
mod status;

pub use clean::cmd_clean;
pub use phase::cmd_phase;
pub use status::cmd_status;
