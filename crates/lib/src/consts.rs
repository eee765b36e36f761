//! Names and layout constants shared across the crate.

pub const APP_NAME: &str = "snapforge";

/// Project descriptor file looked up in the project directory.
pub const PROJECT_FILENAME: &str = "snapforge.yaml";

pub const PARTS_DIR: &str = "parts";
pub const STAGE_DIR: &str = "stage";
pub const PRIME_DIR: &str = "prime";

pub const PART_SRC_DIR: &str = "src";
pub const PART_BUILD_DIR: &str = "build";
pub const PART_INSTALL_DIR: &str = "install";
pub const PART_STATE_DIR: &str = "state";

/// Directory under `parts/` holding the stage/prime ownership indexes.
pub const INDEX_DIR: &str = ".index";

/// Advisory lock file under `parts/`.
pub const LOCK_FILENAME: &str = ".lock";

/// Version stamped into persisted state records and indexes.
pub const STATE_FORMAT_VERSION: u32 = 1;
