//! Tree scanner (C2): walks a root directory into a [`DirectoryIndex`], or
//! just counts entries for the `MonotonicCount` fast path.

use std::path::Path;

use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::entry::{DirectoryIndex, FileEntry};
use crate::error::{Result, SyncError};
use crate::filter::EntryFilter;

/// How often `count()` invokes its progress callback, in entries visited.
pub const COUNT_PROGRESS_STRIDE: usize = 32;

/// Upper bound on how many entries a scan or count visits between
/// cancellation checks (spec §4.3 step 2: "at minimum every 100 entries").
const CANCEL_CHECK_STRIDE: usize = 100;

fn to_rel_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|e| SyncError::scan(e.to_string()).with_path(path))?;
    let mut s = String::new();
    for (i, component) in rel.components().enumerate() {
        if i > 0 {
            s.push('/');
        }
        s.push_str(&component.as_os_str().to_string_lossy());
    }
    Ok(s)
}

/// Walks `root` into a full [`DirectoryIndex`]. Symlinks are not followed
/// and are not recorded as entries (Q3). A directory rejected by `filter`
/// has its entire subtree skipped. Checks `cancel` at least every
/// [`CANCEL_CHECK_STRIDE`] entries visited.
pub fn scan(
    root: &Path,
    filter: Option<&EntryFilter>,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(&str, usize, usize),
) -> Result<DirectoryIndex> {
    let mut index = DirectoryIndex::new();
    if !root.exists() {
        return Ok(index);
    }

    let mut walker = WalkDir::new(root).follow_links(false).into_iter();
    let mut scanned = 0usize;
    let mut visited = 0usize;

    loop {
        let entry = match walker.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(err)) => {
                let path = err.path().map(Path::to_path_buf);
                let mut sync_err = SyncError::scan(err.to_string());
                if let Some(path) = path {
                    sync_err = sync_err.with_path(path);
                }
                return Err(sync_err);
            }
        };

        visited += 1;
        if visited % CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
            return Err(SyncError::cancelled());
        }

        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }

        let rel_path = to_rel_path(root, entry.path())?;
        let is_dir = file_type.is_dir();

        if let Some(filter) = filter {
            if !filter.allows(&rel_path) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
        }

        let metadata = entry
            .metadata()
            .map_err(|e| SyncError::scan(e.to_string()).with_path(entry.path()))?;
        let mod_time = metadata
            .modified()
            .map_err(|e| SyncError::scan(e.to_string()).with_path(entry.path()))?;
        let size = if is_dir { 0 } else { metadata.len() };

        index.insert(FileEntry::new(rel_path.clone(), is_dir, size, mod_time));

        scanned += 1;
        if scanned % COUNT_PROGRESS_STRIDE == 0 {
            on_progress(&rel_path, scanned, 0);
        }
    }

    Ok(index)
}

/// Visits `root` counting regular files (directories and symlinks are not
/// counted) without materializing metadata for each entry. Used by the
/// `MonotonicCount` fast path. Checks `cancel` at least every
/// [`CANCEL_CHECK_STRIDE`] entries visited.
pub fn count(
    root: &Path,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(&str, usize, usize),
) -> Result<usize> {
    if !root.exists() {
        return Ok(0);
    }

    let mut total = 0usize;
    let mut visited = 0usize;
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf);
            let mut sync_err = SyncError::scan(e.to_string());
            if let Some(path) = path {
                sync_err = sync_err.with_path(path);
            }
            sync_err
        })?;

        visited += 1;
        if visited % CANCEL_CHECK_STRIDE == 0 && cancel.is_cancelled() {
            return Err(SyncError::cancelled());
        }

        let file_type = entry.file_type();
        if file_type.is_symlink() || file_type.is_dir() {
            continue;
        }

        total += 1;
        if total % COUNT_PROGRESS_STRIDE == 0 {
            on_progress(&entry.path().to_string_lossy(), total, 0);
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"there").unwrap();

        let cancel = CancelToken::new();
        let index = scan(dir.path(), None, &cancel, |_, _, _| {}).unwrap();
        assert_eq!(index.file_count(), 2);
        assert!(index.contains("a.txt"));
        assert!(index.contains("sub"));
        assert!(index.contains("sub/b.txt"));
    }

    #[test]
    fn missing_root_scans_empty() {
        let cancel = CancelToken::new();
        let index = scan(Path::new("/does/not/exist"), None, &cancel, |_, _, _| {}).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn count_matches_file_count_from_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"there").unwrap();

        let cancel = CancelToken::new();
        let n = count(dir.path(), &cancel, |_, _, _| {}).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn filter_skips_excluded_subtree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("skip")).unwrap();
        fs::write(dir.path().join("skip/nested.txt"), b"x").unwrap();
        fs::write(dir.path().join("keep.txt"), b"y").unwrap();

        let filter = EntryFilter::build(&[], &["skip".to_string(), "skip/**".to_string()]).unwrap();
        let cancel = CancelToken::new();
        let index = scan(dir.path(), Some(&filter), &cancel, |_, _, _| {}).unwrap();
        assert!(!index.contains("skip"));
        assert!(!index.contains("skip/nested.txt"));
        assert!(index.contains("keep.txt"));
    }

    #[test]
    fn scan_stops_when_already_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..150 {
            fs::write(dir.path().join(format!("f{i}.txt")), b"x").unwrap();
        }
        let cancel = CancelToken::new();
        cancel.close();
        let err = scan(dir.path(), None, &cancel, |_, _, _| {}).unwrap_err();
        assert!(err.is_cancelled());
    }
}
