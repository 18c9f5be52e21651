//! Status Store (C7): the single place progress, errors and timing land so
//! the facade, workers, and adaptive controller can all observe and mutate
//! shared run state without taking a lock on the hot path.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use crate::bottleneck::{self, Bottleneck};

const RECENTLY_COMPLETED_CAPACITY: usize = 10;

/// Coarse run phase, mirroring the engine facade's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    Planned,
    Syncing,
    Done,
    Cancelled,
    Failed,
}

/// A single recorded failure: the entry it happened to, and a message.
#[derive(Debug, Clone)]
pub struct RecordedError {
    pub rel_path: String,
    pub message: String,
}

/// Deep-copied, owned view of [`Status`] suitable for handing to a caller
/// or rendering in a UI.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub total_files_in_source: usize,
    pub total_bytes_in_source: u64,
    pub already_synced_files: usize,
    pub already_synced_bytes: u64,
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub cancelled_files: usize,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub current_files: HashSet<String>,
    pub recently_completed: VecDeque<String>,
    pub errors: Vec<RecordedError>,
    pub active_workers: usize,
    pub max_workers: usize,
    pub bottleneck: Bottleneck,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    pub log_path: Option<PathBuf>,
}

impl StatusSnapshot {
    /// Bytes transferred per second since the run started, or `None` before
    /// a start time is recorded or no time has elapsed yet.
    pub fn bytes_per_second(&self) -> Option<f64> {
        let start = self.start_time?;
        let elapsed = SystemTime::now().duration_since(start).ok()?;
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        Some(self.transferred_bytes as f64 / secs)
    }

    /// Estimated remaining time based on current throughput, or `None` when
    /// throughput can't be computed yet or the run is not in progress.
    pub fn estimated_time_left(&self) -> Option<Duration> {
        let rate = self.bytes_per_second()?;
        if rate <= 0.0 {
            return None;
        }
        let remaining_bytes = self.total_bytes.saturating_sub(self.transferred_bytes);
        Some(Duration::from_secs_f64(remaining_bytes as f64 / rate))
    }
}

/// Shared, thread-safe mutable run state. Hot per-buffer/per-file counters
/// are plain atomics; the handful of complex fields (errors, current-files
/// set, recently-completed ring) are behind `parking_lot::RwLock`, which is
/// only ever held for the duration of a small mutation.
#[derive(Debug)]
pub struct Status {
    phase: RwLock<Phase>,
    total_files_in_source: AtomicUsize,
    total_bytes_in_source: AtomicU64,
    already_synced_files: AtomicUsize,
    already_synced_bytes: AtomicU64,
    total_files: AtomicUsize,
    processed_files: AtomicUsize,
    failed_files: AtomicUsize,
    cancelled_files: AtomicUsize,
    total_bytes: AtomicU64,
    transferred_bytes: AtomicU64,
    current_files: RwLock<HashSet<String>>,
    recently_completed: RwLock<VecDeque<String>>,
    errors: RwLock<Vec<RecordedError>>,
    active_workers: AtomicUsize,
    max_workers: AtomicUsize,
    total_read_nanos: AtomicU64,
    total_write_nanos: AtomicU64,
    start_time: RwLock<Option<SystemTime>>,
    end_time: RwLock<Option<SystemTime>>,
    log_path: RwLock<Option<PathBuf>>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            phase: RwLock::new(Phase::Idle),
            total_files_in_source: AtomicUsize::new(0),
            total_bytes_in_source: AtomicU64::new(0),
            already_synced_files: AtomicUsize::new(0),
            already_synced_bytes: AtomicU64::new(0),
            total_files: AtomicUsize::new(0),
            processed_files: AtomicUsize::new(0),
            failed_files: AtomicUsize::new(0),
            cancelled_files: AtomicUsize::new(0),
            total_bytes: AtomicU64::new(0),
            transferred_bytes: AtomicU64::new(0),
            current_files: RwLock::new(HashSet::new()),
            recently_completed: RwLock::new(VecDeque::new()),
            errors: RwLock::new(Vec::new()),
            active_workers: AtomicUsize::new(0),
            max_workers: AtomicUsize::new(0),
            total_read_nanos: AtomicU64::new(0),
            total_write_nanos: AtomicU64::new(0),
            start_time: RwLock::new(None),
            end_time: RwLock::new(None),
            log_path: RwLock::new(None),
        }
    }
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.phase.write() = Phase::Idle;
        self.total_files_in_source.store(0, Ordering::Relaxed);
        self.total_bytes_in_source.store(0, Ordering::Relaxed);
        self.already_synced_files.store(0, Ordering::Relaxed);
        self.already_synced_bytes.store(0, Ordering::Relaxed);
        self.total_files.store(0, Ordering::Relaxed);
        self.processed_files.store(0, Ordering::Relaxed);
        self.failed_files.store(0, Ordering::Relaxed);
        self.cancelled_files.store(0, Ordering::Relaxed);
        self.total_bytes.store(0, Ordering::Relaxed);
        self.transferred_bytes.store(0, Ordering::Relaxed);
        self.current_files.write().clear();
        self.recently_completed.write().clear();
        self.errors.write().clear();
        self.active_workers.store(0, Ordering::Relaxed);
        self.max_workers.store(0, Ordering::Relaxed);
        self.total_read_nanos.store(0, Ordering::Relaxed);
        self.total_write_nanos.store(0, Ordering::Relaxed);
        *self.start_time.write() = None;
        *self.end_time.write() = None;
    }

    pub fn set_phase(&self, phase: Phase) {
        *self.phase.write() = phase;
        if phase == Phase::Syncing && self.start_time.read().is_none() {
            *self.start_time.write() = Some(SystemTime::now());
        }
        if matches!(phase, Phase::Done | Phase::Cancelled | Phase::Failed) && self.end_time.read().is_none() {
            *self.end_time.write() = Some(SystemTime::now());
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    pub fn set_scan_totals(&self, total_files_in_source: usize, total_bytes_in_source: u64) {
        self.total_files_in_source
            .store(total_files_in_source, Ordering::Relaxed);
        self.total_bytes_in_source
            .store(total_bytes_in_source, Ordering::Relaxed);
    }

    pub fn set_plan_totals(&self, total_files: usize, total_bytes: u64) {
        self.total_files.store(total_files, Ordering::Relaxed);
        self.total_bytes.store(total_bytes, Ordering::Relaxed);
    }

    pub fn record_already_synced(&self, files: usize, bytes: u64) {
        self.already_synced_files.fetch_add(files, Ordering::Relaxed);
        self.already_synced_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn begin_file(&self, rel_path: &str) {
        self.current_files.write().insert(rel_path.to_string());
    }

    pub fn add_progress(&self, delta_bytes: u64) {
        self.transferred_bytes.fetch_add(delta_bytes, Ordering::Relaxed);
    }

    pub fn record_timing(&self, read_nanos: u64, write_nanos: u64) {
        self.total_read_nanos.fetch_add(read_nanos, Ordering::Relaxed);
        self.total_write_nanos.fetch_add(write_nanos, Ordering::Relaxed);
    }

    pub fn complete_file(&self, rel_path: &str, bytes: u64) {
        self.current_files.write().remove(rel_path);
        self.processed_files.fetch_add(1, Ordering::Relaxed);
        let _ = bytes;
        let mut ring = self.recently_completed.write();
        ring.push_back(rel_path.to_string());
        while ring.len() > RECENTLY_COMPLETED_CAPACITY {
            ring.pop_front();
        }
    }

    pub fn fail_file(&self, rel_path: &str, message: impl Into<String>) {
        self.current_files.write().remove(rel_path);
        self.failed_files.fetch_add(1, Ordering::Relaxed);
        self.errors.write().push(RecordedError {
            rel_path: rel_path.to_string(),
            message: message.into(),
        });
    }

    pub fn cancel_file(&self, rel_path: &str) {
        self.current_files.write().remove(rel_path);
        self.cancelled_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_count(&self) -> usize {
        self.errors.read().len()
    }

    pub fn record_plan_error(&self, rel_path: &str, message: impl Into<String>) {
        self.errors.write().push(RecordedError {
            rel_path: rel_path.to_string(),
            message: message.into(),
        });
    }

    pub fn set_active_workers(&self, n: usize) {
        self.active_workers.store(n, Ordering::Relaxed);
        let mut max = self.max_workers.load(Ordering::Relaxed);
        while n > max {
            match self.max_workers.compare_exchange_weak(
                max,
                n,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => max = observed,
            }
        }
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn total_read_write_nanos(&self) -> (u64, u64) {
        (
            self.total_read_nanos.load(Ordering::Relaxed),
            self.total_write_nanos.load(Ordering::Relaxed),
        )
    }

    pub fn set_log_path(&self, path: Option<PathBuf>) {
        *self.log_path.write() = path;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let (read_nanos, write_nanos) = self.total_read_write_nanos();
        StatusSnapshot {
            phase: self.phase(),
            total_files_in_source: self.total_files_in_source.load(Ordering::Relaxed),
            total_bytes_in_source: self.total_bytes_in_source.load(Ordering::Relaxed),
            already_synced_files: self.already_synced_files.load(Ordering::Relaxed),
            already_synced_bytes: self.already_synced_bytes.load(Ordering::Relaxed),
            total_files: self.total_files.load(Ordering::Relaxed),
            processed_files: self.processed_files.load(Ordering::Relaxed),
            failed_files: self.failed_files.load(Ordering::Relaxed),
            cancelled_files: self.cancelled_files.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            transferred_bytes: self.transferred_bytes(),
            current_files: self.current_files.read().clone(),
            recently_completed: self.recently_completed.read().clone(),
            errors: self.errors.read().clone(),
            active_workers: self.active_workers(),
            max_workers: self.max_workers.load(Ordering::Relaxed),
            bottleneck: bottleneck::classify(read_nanos, write_nanos),
            start_time: *self.start_time.read(),
            end_time: *self.end_time.read(),
            log_path: self.log_path.read().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recently_completed_caps_at_ten() {
        let status = Status::new();
        for i in 0..15 {
            status.complete_file(&format!("f{i}"), 1);
        }
        let snap = status.snapshot();
        assert_eq!(snap.recently_completed.len(), 10);
        assert_eq!(snap.recently_completed.back().unwrap(), "f14");
    }

    #[test]
    fn max_workers_tracks_high_water_mark() {
        let status = Status::new();
        status.set_active_workers(3);
        status.set_active_workers(5);
        status.set_active_workers(2);
        let snap = status.snapshot();
        assert_eq!(snap.active_workers, 2);
        assert_eq!(snap.max_workers, 5);
    }

    #[test]
    fn phase_transition_to_syncing_records_start_time() {
        let status = Status::new();
        assert!(status.snapshot().start_time.is_none());
        status.set_phase(Phase::Syncing);
        assert!(status.snapshot().start_time.is_some());
        status.set_phase(Phase::Done);
        let snap = status.snapshot();
        assert!(snap.end_time.unwrap() >= snap.start_time.unwrap());
    }

    #[test]
    fn end_time_is_set_once_on_terminal_transition() {
        let status = Status::new();
        status.set_phase(Phase::Syncing);
        status.set_phase(Phase::Done);
        let first = status.snapshot().end_time.unwrap();
        std::thread::sleep(Duration::from_millis(5));
        status.set_phase(Phase::Done);
        let second = status.snapshot().end_time.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn failed_file_is_recorded_as_error() {
        let status = Status::new();
        status.fail_file("a.txt", "permission denied");
        let snap = status.snapshot();
        assert_eq!(snap.failed_files, 1);
        assert_eq!(snap.errors.len(), 1);
        assert_eq!(snap.errors[0].rel_path, "a.txt");
    }
}
