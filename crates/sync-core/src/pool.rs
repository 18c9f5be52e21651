//! Worker pool (C5): OS threads pulling `CopyJob`s off a shared
//! `crossbeam_channel` queue and running them through the copy primitive.
//!
//! Workers never exit early: once spawned, a worker keeps pulling jobs
//! until the channel is closed (the producer side is dropped once the
//! whole copy set has been queued), so the "active worker" count only
//! ever shrinks by natural drain, matching the adaptive controller's
//! "never kill a worker" rule (C6).

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::cancel::CancelToken;
use crate::copy;
use crate::events::{Event, EventSink};
use crate::plan::{CopyJob, JobStatus, ERROR_CEILING};
use crate::status::Status;

/// Shared, cloneable context every worker thread needs. Kept separate from
/// the per-worker thread spawn call so the adaptive controller can spawn
/// additional workers later using the same context.
#[derive(Clone)]
pub struct WorkerContext {
    pub source_root: Arc<PathBuf>,
    pub dest_root: Arc<PathBuf>,
    pub status: Arc<Status>,
    pub cancel: CancelToken,
    pub events: EventSink,
    pub alive: Arc<AtomicUsize>,
}

impl WorkerContext {
    pub fn new(
        source_root: PathBuf,
        dest_root: PathBuf,
        status: Arc<Status>,
        cancel: CancelToken,
        events: EventSink,
    ) -> Self {
        Self {
            source_root: Arc::new(source_root),
            dest_root: Arc::new(dest_root),
            status,
            cancel,
            events,
            alive: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawns one worker thread pulling from `rx`. Call this once per
    /// worker, whether at startup (fixed mode) or later (adaptive scale-up).
    pub fn spawn_one(&self, rx: Receiver<Arc<CopyJob>>) -> JoinHandle<()> {
        let ctx = self.clone();
        let alive = self.alive.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.status.set_active_workers(alive);
        ctx.events.emit(Event::WorkerCountChanged(alive));

        thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                // Once the error ceiling is reached, stop pulling new work;
                // jobs already in flight on other workers still finish.
                if ctx.status.error_count() >= ERROR_CEILING {
                    break;
                }
                process_job(&ctx, &job);
            }
            let remaining = ctx.alive.fetch_sub(1, Ordering::SeqCst) - 1;
            ctx.status.set_active_workers(remaining);
            ctx.events.emit(Event::WorkerCountChanged(remaining));
        })
    }
}

fn process_job(ctx: &WorkerContext, job: &Arc<CopyJob>) {
    let rel_path = job.rel_path.clone();

    if ctx.cancel.is_cancelled() {
        job.set_status(JobStatus::Cancelled);
        ctx.status.cancel_file(&rel_path);
        ctx.events.emit(Event::FileCancelled {
            rel_path: rel_path.clone(),
        });
        return;
    }

    job.set_status(JobStatus::Copying);
    ctx.status.begin_file(&rel_path);
    ctx.events.emit(Event::FileStarted {
        rel_path: rel_path.clone(),
    });

    let src_abs = ctx.source_root.join(&rel_path);
    let dst_abs = ctx.dest_root.join(&rel_path);
    let status = &ctx.status;
    let events = &ctx.events;
    let mut previous = 0u64;

    let result = copy::copy_file(&src_abs, &dst_abs, job.mod_time, &ctx.cancel, |transferred, total| {
        job.set_transferred(transferred);
        status.add_progress(transferred.saturating_sub(previous));
        previous = transferred;
        events.emit(Event::FileProgress {
            rel_path: rel_path.clone(),
            transferred,
            total,
        });
    });

    match result {
        Ok(outcome) => {
            job.set_status(JobStatus::Complete);
            ctx.status.complete_file(&rel_path, outcome.bytes);
            ctx.status.record_timing(
                outcome.read_time.as_nanos() as u64,
                outcome.write_time.as_nanos() as u64,
            );
            ctx.events.emit(Event::FileCompleted {
                rel_path: rel_path.clone(),
                bytes: outcome.bytes,
            });
        }
        Err(err) if err.is_cancelled() => {
            job.set_status(JobStatus::Cancelled);
            ctx.status.cancel_file(&rel_path);
            ctx.events.emit(Event::FileCancelled { rel_path });
        }
        Err(err) => {
            let message = err.to_string();
            job.set_error(message.clone());
            ctx.status.fail_file(&rel_path, message.clone());
            ctx.events.emit(Event::FileErrored { rel_path, message });
        }
    }
}

/// Spawns a fixed number of workers up front. Used when adaptive scaling is
/// disabled; the caller is expected to drop the sending half of `rx`'s
/// channel once every job has been queued so workers drain and exit.
pub fn spawn_fixed(ctx: &WorkerContext, rx: &Receiver<Arc<CopyJob>>, workers: usize) -> Vec<JoinHandle<()>> {
    (0..workers).map(|_| ctx.spawn_one(rx.clone())).collect()
}
