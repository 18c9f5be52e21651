//! Typed, bounded event stream consumers can drain lazily, replacing a
//! callback-based observer interface (see design notes: no process-wide
//! statics, no unbounded fan-out).

use crossbeam_channel::{Receiver, Sender};

use crate::status::Phase;

/// A single lifecycle or progress event emitted by the engine.
#[derive(Debug, Clone)]
pub enum Event {
    PhaseChanged(Phase),
    FileStarted { rel_path: String },
    FileProgress { rel_path: String, transferred: u64, total: u64 },
    FileCompleted { rel_path: String, bytes: u64 },
    FileErrored { rel_path: String, message: String },
    FileCancelled { rel_path: String },
    WorkerCountChanged(usize),
}

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Sending half held by the engine. Sends are non-blocking: once the queue
/// is full, further events are dropped rather than stalling a worker
/// thread, since this stream is advisory (spec §9: "no compatibility
/// contract").
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<Event>,
}

impl EventSink {
    pub fn emit(&self, event: Event) {
        let _ = self.tx.try_send(event);
    }
}

/// Creates a bound sink/receiver pair. Multiple `subscribe()` callers share
/// one receiver (messages are not broadcast to every subscriber); that is
/// an acceptable simplification for the single-consumer UI this engine is
/// built for.
pub fn channel() -> (EventSink, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
    (EventSink { tx }, rx)
}
