//! Argument surface. Deliberately thin: just enough to drive the engine
//! facade end to end, not a full user-facing tool (see SPEC_FULL.md §1).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sync-cli", about = "Drives sync-core's Engine facade for a one-directional directory sync")]
pub struct Cli {
    /// Source directory; must exist.
    pub source: PathBuf,

    /// Destination directory; created if missing.
    pub dest: PathBuf,

    /// Change-detection mode: monotonic-count, fluctuating-count, content,
    /// devious-content, or paranoid (aliases: mc, fc).
    #[arg(long, default_value = "monotonic-count")]
    pub mode: String,

    /// Target worker count. 0 starts adaptive scaling from one worker.
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Force adaptive scaling regardless of --workers.
    #[arg(long)]
    pub adaptive: bool,

    /// Append analysis/sync events to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
