//! Bounded directory enumeration.
//!
//! The walk carries two safety limits so a scan pointed at a huge or
//! hostile tree finishes in bounded time: a wall-clock deadline and a hard
//! cap on visited entries. Siblings are visited in file-name order, so when
//! the cap truncates a scan it always truncates at the same place.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

pub const DEFAULT_DEADLINE_SECS: u64 = 30;
pub const DEFAULT_MAX_ITEMS: usize = 10_000;

/// Safety limits for one scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Wall-clock budget for enumeration and hashing together.
    pub deadline: Duration,
    /// Hard cap on entries visited (directories and errors included).
    pub max_items: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

/// Why a walk ended before the tree was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DeadlineExceeded,
    ItemCapReached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::DeadlineExceeded => f.write_str("deadline exceeded"),
            StopReason::ItemCapReached => f.write_str("item cap reached"),
        }
    }
}

/// One regular file found by the walk.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Slash-separated path relative to the scan root, the baseline key.
    pub rel_path: String,
    pub abs_path: PathBuf,
}

/// Single-pass iterator over the regular files under a root.
///
/// Symlinks are never followed. Unreadable directory entries are counted
/// and skipped rather than ending the walk. The deadline is re-checked on
/// every pull, so time spent hashing between pulls counts against it; once
/// a limit trips, the iterator stays exhausted.
pub struct Enumerator {
    root: PathBuf,
    iter: walkdir::IntoIter,
    deadline: Instant,
    items_left: usize,
    stop: Option<StopReason>,
    walk_errors: u64,
}

impl Enumerator {
    pub fn new(root: &Path, limits: ScanLimits) -> Self {
        let iter = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Self {
            root: root.to_path_buf(),
            iter,
            deadline: Instant::now() + limits.deadline,
            items_left: limits.max_items,
            stop: None,
            walk_errors: 0,
        }
    }

    /// Set once a limit trips; `None` means the tree was fully enumerated.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Entries the walk itself could not read (unreadable directories).
    pub fn walk_errors(&self) -> u64 {
        self.walk_errors
    }
}

impl Iterator for Enumerator {
    type Item = WalkedFile;

    fn next(&mut self) -> Option<WalkedFile> {
        if self.stop.is_some() {
            return None;
        }
        loop {
            if Instant::now() >= self.deadline {
                self.stop = Some(StopReason::DeadlineExceeded);
                return None;
            }
            let entry = self.iter.next()?;
            if self.items_left == 0 {
                // There was at least one more entry than the cap allows.
                self.stop = Some(StopReason::ItemCapReached);
                return None;
            }
            self.items_left -= 1;

            let entry = match entry {
                Ok(e) => e,
                Err(_) => {
                    self.walk_errors += 1;
                    continue;
                }
            };
            // Depth 0 is the root itself, never a candidate.
            if entry.depth() == 0 || !entry.file_type().is_file() {
                continue;
            }
            let Some(rel_path) = relative_key(entry.path(), &self.root) else {
                continue;
            };
            return Some(WalkedFile {
                rel_path,
                abs_path: entry.into_path(),
            });
        }
    }
}

/// Normalize a path under `root` to the baseline's slash-separated key.
pub fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        Some(s.into_owned())
    } else {
        Some(s.replace(std::path::MAIN_SEPARATOR, "/"))
    }
}
