//! Adaptive worker controller (C6): starts at one worker and scales up
//! while measured per-worker throughput keeps improving. Workers are never
//! explicitly killed; the active count only falls through natural drain as
//! the queue empties (spec §4.6, §9 "Adaptive controller subtleties").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::cancel::CancelToken;
use crate::plan::CopyJob;
use crate::pool::WorkerContext;

/// Controller tick interval (spec §4.6: "On a one-second tick").
pub const ADAPTIVE_TICK: Duration = Duration::from_secs(1);

/// Job queue capacity in adaptive mode. Deliberately small (spec §5
/// Backpressure): the producer blocks sending once this fills, which is
/// the desired pacing when workers can't keep up. Fixed mode instead sizes
/// its queue to the whole plan so producers never block there.
pub const ADAPTIVE_QUEUE_CAPACITY: usize = 100;

/// Files-processed-per-worker threshold that must be met since the last
/// evaluation before the controller will even attempt to compute a new
/// throughput sample (spec §4.6 step 3).
const TARGET_FILES_PER_WORKER: usize = 5;

/// Minimum ratio of this tick's per-worker throughput to the previous
/// tick's for the controller to judge that scaling up is still helping
/// (spec §4.6 step 5).
const SCALE_UP_RATIO: f64 = 0.98;

/// Runs `ctx`'s workers adaptively against `rx`, starting at one worker and
/// growing toward `max_workers` (bounded by the size of the copy set —
/// spec passes `|copy_set|`) while per-worker throughput keeps improving.
/// Blocks until every job has been consumed and all spawned workers have
/// drained.
pub fn run(ctx: &WorkerContext, rx: Receiver<Arc<CopyJob>>, max_workers: usize, cancel: &CancelToken) {
    if max_workers == 0 {
        return;
    }

    let mut handles: Vec<JoinHandle<()>> = vec![ctx.spawn_one(rx.clone())];

    let mut last_processed = ctx.status.snapshot().processed_files;
    let mut last_instant = Instant::now();
    let mut prev_per_worker: Option<f64> = None;
    let mut first_measurement = true;

    loop {
        thread::sleep(ADAPTIVE_TICK);

        let alive = ctx.alive.load(Ordering::SeqCst);
        if alive == 0 {
            break;
        }

        // Step 1-2: read the queue depth; an empty queue means nothing to
        // evaluate this tick (workers may still be mid-copy).
        let queue_depth = rx.len();
        if queue_depth == 0 {
            continue;
        }

        let snapshot = ctx.status.snapshot();
        let processed_since_last = snapshot.processed_files.saturating_sub(last_processed);

        // Step 3: not enough signal yet this tick; wait for more.
        if processed_since_last < alive * TARGET_FILES_PER_WORKER {
            continue;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_instant).as_secs_f64().max(0.001);
        let transferred_now = snapshot.transferred_bytes;
        let bytes_per_file = if snapshot.processed_files > 0 {
            transferred_now as f64 / snapshot.processed_files as f64
        } else {
            0.0
        };
        let files_per_second = processed_since_last as f64 / elapsed;
        let per_worker = (bytes_per_file * files_per_second) / alive as f64;

        // Step 6: the first measurement is a baseline and always scales up
        // (subject to the cap); afterwards, step 5's ratio rule applies.
        let should_scale_up = if first_measurement {
            first_measurement = false;
            true
        } else {
            match prev_per_worker {
                Some(prev) if prev > 0.0 => per_worker / prev >= SCALE_UP_RATIO,
                _ => true,
            }
        };

        prev_per_worker = Some(per_worker);
        last_processed = snapshot.processed_files;
        last_instant = now;

        if should_scale_up && alive < max_workers && !cancel.is_cancelled() {
            handles.push(ctx.spawn_one(rx.clone()));
        }
    }

    for handle in handles {
        let _ = handle.join();
    }
}
