//! Baseline and verification engine.
//!
//! The engine turns a directory tree into a [`Baseline`] (relative path to
//! content hash) and compares a freshly scanned tree against a stored one.
//! [`Enumerator`] walks the tree under a deadline and an item cap,
//! [`PathClassifier`] sorts each path into excluded, critical, whitelisted,
//! or normal, file contents are hashed in fixed-size chunks, and the
//! [`Verifier`] reduces two baselines to the drift sets shown to the user.
//!
//! Everything here is synchronous and filesystem-local. Callers that need a
//! hard wall-clock bound run the scan on a worker thread via
//! [`crate::concurrency::run_with_deadline`].

pub mod baseline;
pub mod classify;
pub mod compare;
pub mod hash;
pub mod store;
pub mod walk;

pub use baseline::{Baseline, BaselineBuilder, FileRecord, ScanOutcome, Statistics};
pub use classify::{Classification, PathClassifier, ScanScope};
pub use compare::{ComparisonReport, Verifier, VerifyStatus};
pub use hash::{HashAlgorithm, HashedFile, SkipReason};
pub use walk::{Enumerator, ScanLimits, StopReason};

use thiserror::Error;

/// Errors that abort an engine operation outright.
///
/// Per-file read failures are deliberately not represented here. They are
/// skips, counted in [`Statistics::skipped_files`] and logged, so that one
/// unreadable file cannot take down a whole scan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown hash algorithm {0:?}, expected \"sha256\" or \"sha512\"")]
    UnknownAlgorithm(String),

    #[error("scan root {0:?} is not a directory")]
    RootNotDirectory(String),

    #[error("baseline file not found: {0}")]
    BaselineMissing(String),

    #[error("malformed baseline {path}: {reason}")]
    BaselineMalformed { path: String, reason: String },

    #[error("could not {action} baseline {path}")]
    Storage {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "stored baseline uses {stored} but this scan uses {current}; \
         regenerate the baseline instead of comparing across algorithms"
    )]
    AlgorithmMismatch { stored: String, current: String },

    #[error("scan worker did not finish within the grace period after its deadline")]
    WorkerStalled,
}
