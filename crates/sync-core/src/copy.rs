//! Copy primitive (C4): streams one file from source to destination through
//! a fixed-size buffer, timing reads and writes separately so the
//! bottleneck classifier has data to work with, and checking for
//! cancellation between every buffer.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use filetime::FileTime;

use crate::cancel::CancelToken;
use crate::error::{Result, SyncError};

/// Fixed buffer size for the copy loop. A mid-point of the 64 KiB-1 MiB
/// range; this crate does not carry the teacher's adaptive buffer sizer or
/// OS-specific zero-copy fast paths (see DESIGN.md).
pub const COPY_BUFFER_BYTES: usize = 256 * 1024;

/// Aggregate timing/byte counts from one successful copy, fed into the
/// Status Store for throughput and bottleneck accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOutcome {
    pub bytes: u64,
    pub read_time: Duration,
    pub write_time: Duration,
}

/// Copies `src` to `dst`, creating missing parent directories, preserving
/// the source's modification time, and reporting progress after every
/// buffer. `on_progress` receives `(transferred, total)`.
///
/// On cancellation or I/O failure the partial destination file is removed
/// on a best-effort basis (P8: a cancelled copy leaves no partial file
/// behind) and an error is returned; cancellation is reported as
/// `SyncErrorKind::Cancelled`, everything else as `SyncErrorKind::CopyFile`.
pub fn copy_file(
    src: &Path,
    dst: &Path,
    mod_time: std::time::SystemTime,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<CopyOutcome> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SyncError::copy_file(e.to_string()).with_path(parent))?;
    }

    let total = fs::metadata(src)
        .map_err(|e| SyncError::copy_file(e.to_string()).with_path(src))?
        .len();

    let mut reader =
        File::open(src).map_err(|e| SyncError::copy_file(e.to_string()).with_path(src))?;
    let mut writer =
        File::create(dst).map_err(|e| SyncError::copy_file(e.to_string()).with_path(dst))?;

    let result = (|| -> Result<CopyOutcome> {
        let mut buf = vec![0u8; COPY_BUFFER_BYTES];
        let mut transferred = 0u64;
        let mut read_time = Duration::ZERO;
        let mut write_time = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::cancelled().with_path(dst));
            }

            let read_start = Instant::now();
            let n = reader
                .read(&mut buf)
                .map_err(|e| SyncError::copy_file(e.to_string()).with_path(src))?;
            read_time += read_start.elapsed();

            if n == 0 {
                break;
            }

            let write_start = Instant::now();
            writer
                .write_all(&buf[..n])
                .map_err(|e| SyncError::copy_file(e.to_string()).with_path(dst))?;
            write_time += write_start.elapsed();

            transferred += n as u64;
            on_progress(transferred, total);
        }

        writer
            .flush()
            .map_err(|e| SyncError::copy_file(e.to_string()).with_path(dst))?;

        Ok(CopyOutcome {
            bytes: transferred,
            read_time,
            write_time,
        })
    })();

    drop(reader);
    drop(writer);

    match result {
        Ok(outcome) => {
            let ft = FileTime::from_system_time(mod_time);
            filetime::set_file_mtime(dst, ft)
                .map_err(|e| SyncError::copy_file(e.to_string()).with_path(dst))?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = fs::remove_file(dst);
            Err(err)
        }
    }
}
