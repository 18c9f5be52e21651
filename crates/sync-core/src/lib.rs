//! Core of a one-directional directory synchronizer: scans a source tree,
//! plans the copies and deletions needed to make a destination tree match
//! it under a chosen equality mode, and executes the copy set with an
//! adaptive or fixed pool of OS-thread workers.
//!
//! [`Engine`] is the single entry point; everything else in this crate is
//! a component it composes.

mod adaptive;
mod bottleneck;
mod cancel;
mod change_mode;
mod config;
mod copy;
mod engine;
mod entry;
mod error;
mod events;
mod filter;
mod log_sink;
mod plan;
mod pool;
mod scanner;
mod status;

pub use bottleneck::Bottleneck;
pub use cancel::CancelToken;
pub use change_mode::ChangeMode;
pub use config::{default_log_dir, home_dir, EngineConfig};
pub use engine::Engine;
pub use entry::{DirectoryIndex, FileEntry};
pub use error::{Result, SyncError, SyncErrorKind};
pub use events::Event;
pub use filter::EntryFilter;
pub use plan::{CopyJob, DeleteTarget, JobStatus, Plan, ERROR_CEILING};
pub use scanner::{count, scan, COUNT_PROGRESS_STRIDE};
pub use status::{Phase, RecordedError, Status, StatusSnapshot};
