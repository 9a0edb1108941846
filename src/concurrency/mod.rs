//! Cross-process and cross-thread coordination for scans.

mod deadline;
mod scan_lock;

pub use deadline::run_with_deadline;
pub use scan_lock::{ScanLock, ScanLockGuard};
