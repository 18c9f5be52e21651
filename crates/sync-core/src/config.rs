//! Filesystem-port primitives and the engine's plain configuration struct.

use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};

use crate::change_mode::ChangeMode;
use crate::filter::EntryFilter;

/// Resolves the current user's home directory, used by callers (notably
/// `sync-cli`) that want to expand a bare `~` in a path argument.
pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Default directory for the debug log sink, when a caller wants the
/// platform-appropriate location rather than an explicit path.
pub fn default_log_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "sync-core", "sync-core").map(|dirs| dirs.data_local_dir().to_path_buf())
}

/// A single sync run's configuration. Built with a plain constructor plus
/// setters, matching the options structs the engine facade is modelled on.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub mode: ChangeMode,
    pub workers: usize,
    pub adaptive: bool,
    pub filter: Option<EntryFilter>,
}

impl EngineConfig {
    /// Matches the facade's documented defaults: 4 fixed workers,
    /// `MonotonicCount` mode, adaptive scaling off.
    pub fn new(source_path: impl Into<PathBuf>, dest_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            dest_path: dest_path.into(),
            mode: ChangeMode::MonotonicCount,
            workers: 4,
            adaptive: false,
            filter: None,
        }
    }

    pub fn with_mode(mut self, mode: ChangeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the target worker count. `0` means "start adaptive from one
    /// worker" regardless of `with_adaptive`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Whether this configuration runs the adaptive controller (C6)
    /// instead of the fixed pool (C5): either explicitly enabled, or
    /// implied by `workers == 0`.
    pub fn runs_adaptive(&self) -> bool {
        self.adaptive || self.workers == 0
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_filter(mut self, filter: EntryFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(PathBuf::new(), PathBuf::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_overrides() {
        let cfg = EngineConfig::new("/src", "/dst")
            .with_mode(ChangeMode::Paranoid)
            .with_workers(4)
            .with_adaptive(true);
        assert_eq!(cfg.mode, ChangeMode::Paranoid);
        assert_eq!(cfg.workers, 4);
        assert!(cfg.adaptive);
    }

    #[test]
    fn zero_workers_implies_adaptive() {
        let cfg = EngineConfig::new("/src", "/dst").with_workers(0);
        assert!(cfg.runs_adaptive());
    }

    #[test]
    fn defaults_match_facade_contract() {
        let cfg = EngineConfig::new("/src", "/dst");
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.mode, ChangeMode::MonotonicCount);
        assert!(!cfg.adaptive);
    }
}
