//! Baseline construction: one bounded walk, classified and hashed.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::EngineError;
use super::classify::{Classification, PathClassifier, ScanScope};
use super::hash::{HashAlgorithm, hash_file};
use super::walk::{Enumerator, ScanLimits, StopReason, WalkedFile};

/// One stored file: content hash plus how it was classified at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    #[serde(default = "default_classification")]
    pub classification: Classification,
    #[serde(default)]
    pub size: u64,
}

fn default_classification() -> Classification {
    Classification::Normal
}

/// Counters describing what one scan saw.
///
/// `total_files` always equals the number of stored records. The other
/// counters cover paths that were seen but not stored, or that failed to
/// read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: u64,
    pub critical_files: u64,
    pub whitelisted_files: u64,
    pub excluded_files: u64,
    pub skipped_files: u64,
}

/// Snapshot of a directory tree at one point in time.
///
/// Keys are slash-separated paths relative to the scan root. `BTreeMap`
/// keeps the serialized form sorted, so two baselines of the same tree
/// diff cleanly as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub hash_algorithm: String,
    pub generated_at: DateTime<Utc>,
    pub files: BTreeMap<String, FileRecord>,
    pub statistics: Statistics,
}

/// A finished scan: the baseline plus whether a safety limit cut it short.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub baseline: Baseline,
    /// `Some` when the walk hit its deadline or item cap. The baseline is
    /// still valid, just partial.
    pub stopped_early: Option<StopReason>,
}

/// Drives one scan: walk, classify, hash, count.
///
/// Owns its collaborators so a whole build can move onto a worker thread.
#[derive(Debug, Clone)]
pub struct BaselineBuilder {
    classifier: PathClassifier,
    algorithm: HashAlgorithm,
    limits: ScanLimits,
    scope: Option<ScanScope>,
}

impl BaselineBuilder {
    pub fn new(classifier: PathClassifier, algorithm: HashAlgorithm, limits: ScanLimits) -> Self {
        Self {
            classifier,
            algorithm,
            limits,
            scope: None,
        }
    }

    /// Restrict the scan to paths admitted by `scope`. Out-of-scope paths
    /// do not appear in any statistic.
    pub fn with_scope(mut self, scope: Option<ScanScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Scan `root` and build a baseline from what is found there.
    ///
    /// Per-file read failures are counted and logged, never fatal. A walk
    /// cut short by a safety limit still yields everything hashed so far.
    pub fn build(&self, root: &Path) -> Result<ScanOutcome, EngineError> {
        if !root.is_dir() {
            return Err(EngineError::RootNotDirectory(root.display().to_string()));
        }

        let mut files = BTreeMap::new();
        let mut stats = Statistics::default();
        let mut walk = Enumerator::new(root, self.limits);

        while let Some(WalkedFile { rel_path, abs_path }) = walk.next() {
            if let Some(scope) = &self.scope
                && !scope.admits(&rel_path)
            {
                continue;
            }

            let classification = self.classifier.classify(&rel_path);
            match classification {
                Classification::Excluded => {
                    stats.excluded_files += 1;
                    continue;
                }
                Classification::Whitelisted => {
                    stats.whitelisted_files += 1;
                    continue;
                }
                Classification::Critical => stats.critical_files += 1,
                Classification::Normal => {}
            }

            match hash_file(&abs_path, self.algorithm) {
                Ok(hashed) => {
                    files.insert(
                        rel_path,
                        FileRecord {
                            hash: hashed.digest,
                            classification,
                            size: hashed.size,
                        },
                    );
                }
                Err(reason) => {
                    debug!(path = %rel_path, %reason, "skipping unreadable file");
                    stats.skipped_files += 1;
                }
            }
        }

        stats.skipped_files += walk.walk_errors();
        stats.total_files = files.len() as u64;

        let stopped_early = walk.stop_reason();
        if let Some(reason) = stopped_early {
            warn!(
                %reason,
                stored = stats.total_files,
                "scan stopped early; baseline is partial"
            );
        }

        Ok(ScanOutcome {
            baseline: Baseline {
                hash_algorithm: self.algorithm.as_str().to_string(),
                generated_at: Utc::now(),
                files,
                statistics: stats,
            },
            stopped_early,
        })
    }
}
