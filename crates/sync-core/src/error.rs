//! Typed error surface for the sync engine.
//!
//! Mirrors the error-kind taxonomy the engine is required to distinguish:
//! configuration failures are fatal before a run starts, scan/plan failures
//! unwind immediately, per-file copy failures are counted until the error
//! ceiling is reached, and cancellation is tracked separately from failure.

use std::fmt;
use std::path::PathBuf;

/// The category of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Missing/non-directory paths, invalid mode, invalid filter pattern.
    Configuration,
    /// Unreadable directory encountered during a scan.
    Scan,
    /// Destination deletions failed enough times to abort planning.
    Plan,
    /// A single file failed to copy.
    CopyFile,
    /// The operation was cancelled; not a failure, but distinguished from
    /// `CopyFile` so callers can tell the two apart.
    Cancelled,
    /// Internal invariant was violated; always indicates a bug.
    InvariantViolated,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncErrorKind::Configuration => "configuration",
            SyncErrorKind::Scan => "scan",
            SyncErrorKind::Plan => "plan",
            SyncErrorKind::CopyFile => "copy",
            SyncErrorKind::Cancelled => "cancelled",
            SyncErrorKind::InvariantViolated => "invariant violated",
        };
        f.write_str(s)
    }
}

/// An engine error, tagged with the kind that drives caller-visible
/// behaviour (fatal vs. counted, cancelled vs. failed).
#[derive(Debug)]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub message: String,
    pub path: Option<PathBuf>,
    source: Option<eyre::Report>,
}

impl SyncError {
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: eyre::Report) -> Self {
        self.source = Some(source);
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Configuration, message)
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Scan, message)
    }

    pub fn plan(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::Plan, message)
    }

    pub fn copy_file(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::CopyFile, message)
    }

    pub fn cancelled() -> Self {
        Self::new(SyncErrorKind::Cancelled, "operation cancelled")
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(SyncErrorKind::InvariantViolated, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == SyncErrorKind::Cancelled
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}: {}", self.kind, path.display(), self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|r| r.as_ref() as _)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::new(SyncErrorKind::CopyFile, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
