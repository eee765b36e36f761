//! Per-part, per-phase completion records.
//!
//! When a phase succeeds, the fingerprint of its inputs is persisted so the
//! next run can skip it if nothing changed.
//!
//! # Storage Layout
//!
//! ```text
//! parts/<name>/state/
//! ├── pull.json
//! ├── build.json
//! ├── stage.json
//! └── prime.json
//! ```
//!
//! # Example Record
//!
//! ```json
//! {
//!   "version": 1,
//!   "fingerprint": "3f1c…",
//!   "completed_at_unix": 1760000000
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{PART_STATE_DIR, STATE_FORMAT_VERSION};
use crate::phase::Phase;
use crate::util::fs::write_atomic;
use crate::util::hash::Fingerprint;

/// Persisted completion of one phase of one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
  pub version: u32,
  pub fingerprint: Fingerprint,
  pub completed_at_unix: u64,
}

impl StateRecord {
  pub fn new(fingerprint: Fingerprint) -> Self {
    let completed_at_unix = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or(0);
    Self {
      version: STATE_FORMAT_VERSION,
      fingerprint,
      completed_at_unix,
    }
  }
}

#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read state record {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write state record {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove state record {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse state record {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize state record: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("state record {path} has unsupported version {version}")]
  UnsupportedVersion { path: PathBuf, version: u32 },
}

/// Reads and writes state records under the parts directory.
#[derive(Debug, Clone)]
pub struct StateStore {
  parts_dir: PathBuf,
}

impl StateStore {
  pub fn new(parts_dir: &Path) -> Self {
    Self {
      parts_dir: parts_dir.to_path_buf(),
    }
  }

  pub fn record_path(&self, part: &str, phase: Phase) -> PathBuf {
    self
      .parts_dir
      .join(part)
      .join(PART_STATE_DIR)
      .join(format!("{}.json", phase.as_str()))
  }

  /// Load the record for `(part, phase)`. `Ok(None)` if the phase never
  /// completed or was invalidated.
  pub fn load(&self, part: &str, phase: Phase) -> Result<Option<StateRecord>, StateError> {
    let path = self.record_path(part, phase);

    let content = match fs::read_to_string(&path) {
      Ok(c) => c,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(part = %part, phase = %phase, "no state record");
        return Ok(None);
      }
      Err(source) => return Err(StateError::Read { path, source }),
    };

    let record: StateRecord = serde_json::from_str(&content).map_err(|source| StateError::Parse {
      path: path.clone(),
      source,
    })?;
    if record.version != STATE_FORMAT_VERSION {
      return Err(StateError::UnsupportedVersion {
        path,
        version: record.version,
      });
    }
    Ok(Some(record))
  }

  /// Like [`load`](Self::load), but unreadable records are logged and
  /// reported as absent.
  pub fn load_lenient(&self, part: &str, phase: Phase) -> Option<StateRecord> {
    match self.load(part, phase) {
      Ok(record) => record,
      Err(e) => {
        warn!(part = %part, phase = %phase, error = %e, "ignoring unreadable state record");
        None
      }
    }
  }

  /// True iff a record exists whose fingerprint equals `fingerprint`.
  pub fn is_up_to_date(&self, part: &str, phase: Phase, fingerprint: &Fingerprint) -> bool {
    self
      .load_lenient(part, phase)
      .is_some_and(|record| record.fingerprint == *fingerprint)
  }

  /// Persist a successful completion, replacing any previous record.
  pub fn record_success(&self, part: &str, phase: Phase, fingerprint: &Fingerprint) -> Result<StateRecord, StateError> {
    let path = self.record_path(part, phase);
    let record = StateRecord::new(fingerprint.clone());
    let content = serde_json::to_string_pretty(&record).map_err(StateError::Serialize)?;

    write_atomic(&path, content.as_bytes()).map_err(|source| StateError::Write {
      path: path.clone(),
      source,
    })?;

    info!(part = %part, phase = %phase, fingerprint = %fingerprint, "phase recorded");
    Ok(record)
  }

  /// Remove the records for `phase` and every later phase of `part`.
  pub fn invalidate_from(&self, part: &str, phase: Phase) -> Result<(), StateError> {
    for later in phase.and_later() {
      let path = self.record_path(part, later);
      match fs::remove_file(&path) {
        Ok(()) => debug!(part = %part, phase = %later, "state invalidated"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(StateError::Remove { path, source }),
      }
    }
    Ok(())
  }
}
