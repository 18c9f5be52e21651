//! Engine facade (C9): the one type external callers touch. Drives the
//! Idle -> Analyzing -> Planned -> Syncing -> {Done | Cancelled | Failed}
//! state machine and owns every other component.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::adaptive;
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{Result, SyncError};
use crate::events::{Event, EventSink};
use crate::log_sink::DebugLog;
use crate::plan::{self, Plan};
use crate::pool::{self, WorkerContext};
use crate::status::{Phase, Status, StatusSnapshot};

pub struct Engine {
    config: EngineConfig,
    status: Arc<Status>,
    cancel: CancelToken,
    events: EventSink,
    events_rx: Receiver<Event>,
    plan: Mutex<Option<Plan>>,
    debug_log: Mutex<Option<Arc<DebugLog>>>,
}

impl Engine {
    /// Validates the configuration (source/destination must exist and be
    /// directories) and builds an idle engine.
    pub fn new(config: EngineConfig) -> Result<Self> {
        if !config.source_path.is_dir() {
            return Err(SyncError::configuration("source path is not a directory")
                .with_path(&config.source_path));
        }
        if config.dest_path.exists() && !config.dest_path.is_dir() {
            return Err(SyncError::configuration("destination path exists and is not a directory")
                .with_path(&config.dest_path));
        }
        let (events, events_rx) = crate::events::channel();
        Ok(Self {
            config,
            status: Arc::new(Status::new()),
            cancel: CancelToken::new(),
            events,
            events_rx,
            plan: Mutex::new(None),
            debug_log: Mutex::new(None),
        })
    }

    /// Attaches a debug log sink; subsequent phase transitions append a
    /// line to it. Independent of the process-wide `log` crate logger.
    pub fn enable_file_log(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let log = Arc::new(DebugLog::open(&path)?);
        self.status.set_log_path(Some(log.path().to_path_buf()));
        *self.debug_log.lock() = Some(log);
        Ok(())
    }

    fn log(&self, message: &str) {
        log::debug!("{message}");
        if let Some(log) = self.debug_log.lock().as_ref() {
            log.write_line(message);
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Returns a receiver for the engine's event stream. All subscribers
    /// share one underlying queue (see `events` module).
    pub fn subscribe(&self) -> Receiver<Event> {
        self.events_rx.clone()
    }

    pub fn cancel(&self) {
        self.cancel.close();
    }

    /// Runs the scan + diff + deletion pass (C2 + C3). On success leaves
    /// the engine in `Planned` with totals recorded on the Status Store; on
    /// failure leaves it in `Failed` and returns the error.
    pub fn analyze(&self) -> Result<()> {
        match self.status.phase() {
            Phase::Analyzing | Phase::Planned | Phase::Syncing => {
                return Err(SyncError::invariant("analyze called while a run is in progress"));
            }
            _ => {}
        }

        self.status.reset();
        self.cancel.reset();
        self.status.set_phase(Phase::Analyzing);
        self.log(&format!(
            "analyze started: {} -> {}",
            self.config.source_path.display(),
            self.config.dest_path.display()
        ));

        let status = self.status.clone();
        let result = plan::analyze(
            &self.config.source_path,
            &self.config.dest_path,
            self.config.mode,
            self.config.filter.as_ref(),
            &status,
            &self.cancel,
            |rel_path, scanned, total| {
                self.events.emit(Event::FileProgress {
                    rel_path: rel_path.to_string(),
                    transferred: scanned as u64,
                    total: total as u64,
                });
            },
        );

        match result {
            Ok((plan, stats)) => {
                self.status
                    .set_scan_totals(stats.total_files_in_source, stats.total_bytes_in_source);
                self.status
                    .record_already_synced(stats.already_synced_files, stats.already_synced_bytes);
                let copy_bytes: u64 = plan.copy_set.iter().map(|j| j.size).sum();
                self.status.set_plan_totals(plan.copy_set.len(), copy_bytes);
                *self.plan.lock() = Some(plan);
                self.status.set_phase(Phase::Planned);
                self.log("analyze finished");
                self.events.emit(Event::PhaseChanged(Phase::Planned));
                Ok(())
            }
            Err(err) => {
                self.status.set_phase(Phase::Failed);
                self.log(&format!("analyze failed: {err}"));
                self.events.emit(Event::PhaseChanged(Phase::Failed));
                Err(err)
            }
        }
    }

    /// Executes the copy set produced by `analyze`. Requires `Planned`.
    pub fn sync(&self) -> Result<()> {
        if self.status.phase() != Phase::Planned {
            return Err(SyncError::invariant("sync called before a successful analyze"));
        }

        let plan = self
            .plan
            .lock()
            .take()
            .ok_or_else(|| SyncError::invariant("no plan available for sync"))?;

        self.status.set_phase(Phase::Syncing);
        self.events.emit(Event::PhaseChanged(Phase::Syncing));
        self.log(&format!("sync started: {} files queued", plan.copy_set.len()));

        if !plan.copy_set.is_empty() {
            let ctx = WorkerContext::new(
                self.config.source_path.clone(),
                self.config.dest_path.clone(),
                self.status.clone(),
                self.cancel.clone(),
                self.events.clone(),
            );

            if self.config.runs_adaptive() {
                // Small, fixed-capacity queue: the producer blocks sending
                // once it fills, which paces ingestion to what the workers
                // can actually keep up with (spec §5 Backpressure).
                let (tx, rx) = crossbeam_channel::bounded(adaptive::ADAPTIVE_QUEUE_CAPACITY);
                let jobs = plan.copy_set.clone();
                let producer = thread::spawn(move || {
                    for job in jobs {
                        if tx.send(job).is_err() {
                            break;
                        }
                    }
                });
                adaptive::run(&ctx, rx, plan.copy_set.len(), &self.cancel);
                let _ = producer.join();
            } else {
                // Queue sized to the whole plan: every job is already
                // queued before any worker starts, so producers never
                // block (spec §5 Backpressure).
                let (tx, rx) = crossbeam_channel::bounded(plan.copy_set.len());
                for job in &plan.copy_set {
                    let _ = tx.send(job.clone());
                }
                drop(tx);

                let workers = self.config.workers.min(plan.copy_set.len()).max(1);
                let handles = pool::spawn_fixed(&ctx, &rx, workers);
                for handle in handles {
                    let _ = handle.join();
                }
            }
        }

        let (final_phase, outcome) = if self.cancel.is_cancelled() {
            (Phase::Cancelled, Ok(()))
        } else {
            let error_count = self.status.error_count();
            if error_count == 0 {
                (Phase::Done, Ok(()))
            } else {
                let first = self
                    .status
                    .snapshot()
                    .errors
                    .first()
                    .map(|e| format!("{}: {}", e.rel_path, e.message))
                    .unwrap_or_default();
                if error_count >= plan::ERROR_CEILING {
                    (
                        Phase::Failed,
                        Err(SyncError::copy_file(format!(
                            "sync aborted after reaching the error ceiling ({error_count} errors); first error: {first}"
                        ))),
                    )
                } else {
                    (
                        Phase::Done,
                        Err(SyncError::copy_file(format!(
                            "sync completed with {error_count} error(s); first error: {first}"
                        ))),
                    )
                }
            }
        };

        self.status.set_phase(final_phase);
        self.log(&format!("sync finished: {final_phase:?}"));
        self.events.emit(Event::PhaseChanged(final_phase));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_mode::ChangeMode;
    use std::fs;

    fn engine_for(src: &std::path::Path, dst: &std::path::Path) -> Engine {
        let config = EngineConfig::new(src, dst).with_mode(ChangeMode::Content);
        Engine::new(config).unwrap()
    }

    #[test]
    fn full_run_copies_missing_files_and_reaches_done() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();

        let engine = engine_for(src.path(), dst.path());
        engine.analyze().unwrap();
        assert_eq!(engine.status().phase, Phase::Planned);
        engine.sync().unwrap();

        let snap = engine.status();
        assert_eq!(snap.phase, Phase::Done);
        assert_eq!(snap.processed_files, 1);
        assert!(dst.path().join("a.txt").exists());
    }

    #[test]
    fn sync_before_analyze_is_rejected() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let engine = engine_for(src.path(), dst.path());
        let err = engine.sync().unwrap_err();
        assert_eq!(err.kind, crate::error::SyncErrorKind::InvariantViolated);
    }

    #[test]
    fn cancel_before_sync_starts_yields_cancelled_phase() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();

        let engine = engine_for(src.path(), dst.path());
        engine.analyze().unwrap();
        engine.cancel();
        engine.sync().unwrap();
        assert_eq!(engine.status().phase, Phase::Cancelled);
    }

    #[test]
    fn nonexistent_source_is_configuration_error() {
        let dst = tempfile::tempdir().unwrap();
        let config = EngineConfig::new("/does/not/exist", dst.path());
        let err = Engine::new(config).unwrap_err();
        assert_eq!(err.kind, crate::error::SyncErrorKind::Configuration);
    }
}
