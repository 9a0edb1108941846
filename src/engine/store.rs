//! Baseline persistence: pretty-printed JSON on disk.
//!
//! Loading is tolerant of older baseline formats. Documents written before
//! the statistics block existed load with synthesized counters, and a
//! missing `hash_algorithm` falls back to sha256, each with a warning. A
//! structurally broken `files` map is a hard error; guessing at hashes
//! would defeat the point of verifying them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::EngineError;
use super::baseline::{Baseline, FileRecord, Statistics};

/// On-disk form, with everything the current format requires made optional
/// so older documents still deserialize.
#[derive(Debug, Deserialize)]
struct StoredBaseline {
    #[serde(default)]
    hash_algorithm: Option<String>,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
    files: BTreeMap<String, FileRecord>,
    #[serde(default)]
    statistics: Option<Statistics>,
}

/// Write `baseline` to `dest`, creating parent directories as needed.
pub fn save(baseline: &Baseline, dest: &Path) -> Result<(), EngineError> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| EngineError::Storage {
            action: "write",
            path: dest.display().to_string(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(baseline).map_err(|e| EngineError::BaselineMalformed {
        path: dest.display().to_string(),
        reason: e.to_string(),
    })?;

    fs::write(dest, json).map_err(|e| EngineError::Storage {
        action: "write",
        path: dest.display().to_string(),
        source: e,
    })
}

/// Load a baseline, upgrading older formats in memory.
pub fn load(source: &Path) -> Result<Baseline, EngineError> {
    let path = source.display().to_string();

    let raw = fs::read_to_string(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EngineError::BaselineMissing(path.clone()),
        _ => EngineError::Storage {
            action: "read",
            path: path.clone(),
            source: e,
        },
    })?;

    let stored: StoredBaseline =
        serde_json::from_str(&raw).map_err(|e| EngineError::BaselineMalformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let file_count = stored.files.len() as u64;
    let statistics = match stored.statistics {
        Some(s) => s,
        None => {
            warn!(
                %path,
                "baseline predates the statistics block; counters other than total_files read as zero"
            );
            Statistics {
                total_files: file_count,
                ..Statistics::default()
            }
        }
    };

    let hash_algorithm = match stored.hash_algorithm {
        Some(a) => a,
        None => {
            warn!(%path, "baseline does not name its hash algorithm, assuming sha256");
            "sha256".to_string()
        }
    };

    let generated_at = stored.generated_at.unwrap_or_else(|| {
        debug!(%path, "baseline has no generated_at timestamp");
        DateTime::UNIX_EPOCH
    });

    Ok(Baseline {
        hash_algorithm,
        generated_at,
        files: stored.files,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_baseline() -> Baseline {
        let mut files = BTreeMap::new();
        files.insert(
            "src/main.rs".to_string(),
            FileRecord {
                hash: "aa".repeat(32),
                classification: crate::engine::Classification::Normal,
                size: 120,
            },
        );
        Baseline {
            hash_algorithm: "sha256".to_string(),
            generated_at: Utc::now(),
            files,
            statistics: Statistics {
                total_files: 1,
                ..Statistics::default()
            },
        }
    }

    #[test]
    fn save_then_load_preserves_records() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested/dir/baseline.json");

        let baseline = sample_baseline();
        save(&baseline, &dest).unwrap();
        let loaded = load(&dest).unwrap();

        assert_eq!(loaded.hash_algorithm, "sha256");
        assert_eq!(loaded.files, baseline.files);
        assert_eq!(loaded.statistics, baseline.statistics);
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EngineError::BaselineMissing(_)));
    }

    #[test]
    fn legacy_document_without_statistics_is_upgraded() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("legacy.json");
        fs::write(
            &dest,
            r#"{
              "hash_algorithm": "sha256",
              "generated_at": "2023-04-01T12:00:00Z",
              "files": {
                "a.txt": { "hash": "00ff", "classification": "normal", "size": 4 },
                "b.txt": { "hash": "11ee", "classification": "critical", "size": 9 }
              }
            }"#,
        )
        .unwrap();

        let loaded = load(&dest).unwrap();
        assert_eq!(loaded.statistics.total_files, 2);
        assert_eq!(loaded.statistics.critical_files, 0);
        assert_eq!(loaded.statistics.skipped_files, 0);
    }

    #[test]
    fn legacy_document_without_algorithm_assumes_sha256() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("old.json");
        fs::write(
            &dest,
            r#"{ "files": { "a.txt": { "hash": "00ff" } } }"#,
        )
        .unwrap();

        let loaded = load(&dest).unwrap();
        assert_eq!(loaded.hash_algorithm, "sha256");
        assert_eq!(loaded.generated_at, DateTime::UNIX_EPOCH);
        // Per-record defaults also apply to sparse legacy records.
        let record = &loaded.files["a.txt"];
        assert_eq!(record.classification, crate::engine::Classification::Normal);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn files_that_are_not_a_map_fail_hard() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("broken.json");
        fs::write(&dest, r#"{ "files": ["not", "a", "map"] }"#).unwrap();

        let err = load(&dest).unwrap_err();
        assert!(matches!(err, EngineError::BaselineMalformed { .. }));
    }

    #[test]
    fn record_missing_its_hash_fails_hard() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nohash.json");
        fs::write(
            &dest,
            r#"{ "files": { "a.txt": { "classification": "normal", "size": 1 } } }"#,
        )
        .unwrap();

        let err = load(&dest).unwrap_err();
        assert!(matches!(err, EngineError::BaselineMalformed { .. }));
    }

    #[test]
    fn serialized_form_is_sorted_and_diffable() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("baseline.json");

        let mut baseline = sample_baseline();
        baseline.files.insert(
            "a_first.txt".to_string(),
            FileRecord {
                hash: "bb".repeat(32),
                classification: crate::engine::Classification::Normal,
                size: 1,
            },
        );
        save(&baseline, &dest).unwrap();

        let text = fs::read_to_string(&dest).unwrap();
        let a = text.find("a_first.txt").unwrap();
        let b = text.find("src/main.rs").unwrap();
        assert!(a < b, "keys should serialize in sorted order");
    }
}
