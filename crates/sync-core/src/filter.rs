//! Optional glob-based include/exclude filtering applied during a scan.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{SyncError, Result};

/// Compiled include/exclude glob patterns. An entry is kept when it matches
/// no exclude pattern, and when either no include patterns are set or it
/// matches at least one of them.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl EntryFilter {
    pub fn build(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = if include.is_empty() {
            None
        } else {
            Some(compile(include)?)
        };
        let exclude = compile(exclude)?;
        Ok(Self { include, exclude })
    }

    /// Whether `rel_path` should be kept. Directories that fail this check
    /// have their whole subtree skipped by the scanner.
    pub fn allows(&self, rel_path: &str) -> bool {
        if self.exclude.is_match(rel_path) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(rel_path),
            None => true,
        }
    }
}

fn compile(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| SyncError::configuration(format!("invalid glob {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SyncError::configuration(format!("failed to compile glob set: {e}")))
}
