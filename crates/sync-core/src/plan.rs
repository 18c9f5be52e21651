//! Planner (C3): diffs a scanned source tree against a scanned destination
//! tree, executes destination-only deletions eagerly, and hands back the
//! copy set for the sync phase to execute.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::cancel::CancelToken;
use crate::change_mode::{entry_is_synced, ChangeMode};
use crate::entry::{depth_of, DirectoryIndex};
use crate::error::{Result, SyncError};
use crate::scanner;
use crate::status::Status;

/// Deletion failures allowed before planning aborts. Fixed, not
/// configurable (spec §4.3).
pub const ERROR_CEILING: usize = 10;

/// Upper bound on how many source entries the per-file diff loop visits
/// between cancellation checks (spec §4.3 step 2: "at minimum every 100
/// entries").
const DIFF_CANCEL_CHECK_STRIDE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Copying,
    Complete,
    Error,
    Cancelled,
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    error: Option<String>,
}

/// One file the sync phase needs to copy. Shared via `Arc` between the
/// plan and the Status Store's current-files bookkeeping; workers mutate
/// it as they claim and finish jobs.
#[derive(Debug)]
pub struct CopyJob {
    pub rel_path: String,
    pub size: u64,
    pub mod_time: SystemTime,
    transferred: AtomicU64,
    state: Mutex<JobState>,
}

impl CopyJob {
    pub(crate) fn new(rel_path: String, size: u64, mod_time: SystemTime) -> Self {
        Self {
            rel_path,
            size,
            mod_time,
            transferred: AtomicU64::new(0),
            state: Mutex::new(JobState {
                status: JobStatus::Pending,
                error: None,
            }),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status
    }

    pub fn set_status(&self, status: JobStatus) {
        self.state.lock().status = status;
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        state.status = JobStatus::Error;
        state.error = Some(message.into());
    }

    pub fn set_transferred(&self, bytes: u64) {
        self.transferred.store(bytes, Ordering::Relaxed);
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }
}

/// A destination-only path that was removed during planning.
#[derive(Debug, Clone)]
pub struct DeleteTarget {
    pub rel_path: String,
    pub is_dir: bool,
}

/// The result of planning: what needs to be copied, and what was already
/// deleted from the destination.
#[derive(Debug, Default)]
pub struct Plan {
    pub copy_set: Vec<Arc<CopyJob>>,
    pub delete_set: Vec<DeleteTarget>,
}

/// Summary counters produced alongside a [`Plan`], fed into the Status
/// Store by the engine facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanStats {
    pub total_files_in_source: usize,
    pub total_bytes_in_source: u64,
    pub already_synced_files: usize,
    pub already_synced_bytes: u64,
}

/// Runs the full scan + diff + deletion algorithm (spec §4.3). Deletions
/// are executed against the filesystem as part of this call, not deferred
/// to the sync phase; failures are recorded on `status` and counted
/// against `ERROR_CEILING`.
pub fn analyze(
    source_root: &Path,
    dest_root: &Path,
    mode: ChangeMode,
    filter: Option<&crate::filter::EntryFilter>,
    status: &Status,
    cancel: &CancelToken,
    mut on_scan_progress: impl FnMut(&str, usize, usize),
) -> Result<(Plan, PlanStats)> {
    if mode == ChangeMode::MonotonicCount {
        let src_count = scanner::count(source_root, cancel, |p, n, t| on_scan_progress(p, n, t))?;
        let dst_count = scanner::count(dest_root, cancel, |_, _, _| {})?;
        if src_count == dst_count {
            return Ok((
                Plan::default(),
                PlanStats {
                    total_files_in_source: src_count,
                    total_bytes_in_source: 0,
                    already_synced_files: src_count,
                    already_synced_bytes: 0,
                },
            ));
        }
    }

    if cancel.is_cancelled() {
        return Err(SyncError::cancelled());
    }

    let source_index = scanner::scan(source_root, filter, cancel, &mut on_scan_progress)?;
    let dest_index = scanner::scan(dest_root, filter, cancel, |_, _, _| {})?;

    if cancel.is_cancelled() {
        return Err(SyncError::cancelled());
    }

    let mut copy_set = Vec::new();
    let mut already_synced_files = 0usize;
    let mut already_synced_bytes = 0u64;

    for (i, src_entry) in source_index.files().enumerate() {
        if i % DIFF_CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
            return Err(SyncError::cancelled());
        }

        let dst_entry = dest_index.get(&src_entry.rel_path);
        let src_abs = source_root.join(&src_entry.rel_path);
        let dst_abs = dest_root.join(&src_entry.rel_path);
        let synced = entry_is_synced(mode, src_entry, dst_entry, &src_abs, &dst_abs)?;
        if synced {
            already_synced_files += 1;
            already_synced_bytes += src_entry.size;
        } else {
            copy_set.push(Arc::new(CopyJob::new(
                src_entry.rel_path.clone(),
                src_entry.size,
                src_entry.mod_time,
            )));
        }
    }

    let delete_set = plan_deletions(&source_index, &dest_index, dest_root, status)?;

    let stats = PlanStats {
        total_files_in_source: source_index.file_count(),
        total_bytes_in_source: source_index.total_bytes(),
        already_synced_files,
        already_synced_bytes,
    };

    Ok((
        Plan {
            copy_set,
            delete_set,
        },
        stats,
    ))
}

fn plan_deletions(
    source_index: &DirectoryIndex,
    dest_index: &DirectoryIndex,
    dest_root: &Path,
    status: &Status,
) -> Result<Vec<DeleteTarget>> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in dest_index.iter() {
        if source_index.contains(&entry.rel_path) {
            continue;
        }
        if entry.is_dir {
            dirs.push(entry.rel_path.clone());
        } else {
            files.push(entry.rel_path.clone());
        }
    }

    dirs.sort_by_key(|p| depth_of(p));
    dirs.reverse();

    let mut applied = Vec::with_capacity(files.len() + dirs.len());
    let mut failures = 0usize;

    for rel_path in &files {
        let abs = dest_root.join(rel_path);
        let result = fs::remove_file(&abs);
        if result.is_ok() || !abs.exists() {
            applied.push(DeleteTarget {
                rel_path: rel_path.clone(),
                is_dir: false,
            });
        } else if let Err(e) = result {
            failures += 1;
            status.record_plan_error(rel_path, e.to_string());
            if failures >= ERROR_CEILING {
                return Err(SyncError::plan(format!(
                    "aborting planning after {failures} deletion failures"
                )));
            }
        }
    }

    for rel_path in &dirs {
        let abs = dest_root.join(rel_path);
        let result = fs::remove_dir(&abs);
        if result.is_ok() || !abs.exists() {
            applied.push(DeleteTarget {
                rel_path: rel_path.clone(),
                is_dir: true,
            });
        } else if let Err(e) = result {
            failures += 1;
            status.record_plan_error(rel_path, e.to_string());
            if failures >= ERROR_CEILING {
                return Err(SyncError::plan(format!(
                    "aborting planning after {failures} deletion failures"
                )));
            }
        }
    }

    Ok(applied)
}
