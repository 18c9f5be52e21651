//! Optional engine-owned debug log sink: one append-only, human-readable
//! file per run, independent of the `log` crate's global logger.
//!
//! Grounded on the teacher's local performance history writer, which
//! appends one record per run to a capped file under the user's config
//! directory; this sink appends one line per notable event instead, since
//! spec §6 describes it as advisory with no compatibility contract (so
//! plain text, not JSON).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use crate::error::{Result, SyncError};

/// Serializes writes from whichever worker thread happens to log an event.
/// Scoped per-engine rather than process-global (design notes: no
/// process-wide statics).
pub struct DebugLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DebugLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::configuration(e.to_string()).with_path(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SyncError::configuration(e.to_string()).with_path(&path))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&self, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
        let mut file = self.file.lock();
        let _ = writeln!(file, "[{timestamp}] {message}");
    }
}
