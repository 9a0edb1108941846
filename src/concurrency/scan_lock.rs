//! Cross-process scan lock using advisory file locking (fs2 flock).
//!
//! Serializes scans across processes (CLI runs, the watch scheduler) so
//! two of them never hash the same tree or write the same baseline at
//! once.

use anyhow::Result;
use fs2::FileExt;
use std::fs::{self, File};
use std::path::PathBuf;

/// Advisory file lock guarding scan work.
///
/// The lock file lives in the runtime directory (or state directory
/// fallback), outside any scanned tree, so it never shows up as drift.
#[derive(Clone)]
pub struct ScanLock {
    path: PathBuf,
}

/// RAII guard that releases the lock on drop.
pub struct ScanLockGuard {
    file: File,
}

impl Drop for ScanLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl ScanLock {
    /// Create a lock at `path`, ensuring its parent directory exists.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Non-blocking try-acquire — returns `None` if another process holds
    /// it. There is deliberately no blocking variant: every caller (the CLI
    /// and the scheduler alike) skips or bails when a scan is already
    /// running, rather than queueing behind it.
    pub fn try_acquire(&self) -> Result<Option<ScanLockGuard>> {
        let file = File::create(&self.path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(ScanLockGuard { file })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            #[cfg(unix)]
            Err(ref e) if e.raw_os_error() == Some(35) || e.raw_os_error() == Some(11) => {
                // EAGAIN(11) / EWOULDBLOCK(35 on macOS) — lock contention
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
