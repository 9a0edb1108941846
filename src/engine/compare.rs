//! Baseline comparison: reduce two snapshots to drift sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::EngineError;
use super::baseline::Baseline;
use super::classify::{Classification, PathClassifier};

/// Overall verdict of one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerifyStatus {
    Pass,
    Fail,
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyStatus::Pass => f.write_str("PASS"),
            VerifyStatus::Fail => f.write_str("FAIL"),
        }
    }
}

/// Everything one verification run found, as sorted path sets.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub overall_status: VerifyStatus,
    /// Present in both trees with matching hashes.
    pub unchanged: BTreeSet<String>,
    /// Present in both trees with differing hashes.
    pub modified: BTreeSet<String>,
    /// In the stored baseline but gone from disk.
    pub missing: BTreeSet<String>,
    /// On disk but absent from the stored baseline.
    pub unauthorized: BTreeSet<String>,
    /// Modified or missing paths that the current rules mark critical.
    pub critical_violations: BTreeSet<String>,
}

impl ComparisonReport {
    pub fn passed(&self) -> bool {
        self.overall_status == VerifyStatus::Pass
    }

    /// Total paths that constitute drift.
    pub fn drift_count(&self) -> usize {
        self.modified.len() + self.missing.len() + self.unauthorized.len()
    }
}

/// Compares a stored baseline against a live scan of the same root.
///
/// The classifier reflects the current rules, which may be newer than the
/// stored baseline. A stored path that today's rules exclude or whitelist
/// has been descoped on purpose, so its absence from the live scan is not
/// drift.
pub struct Verifier<'a> {
    classifier: &'a PathClassifier,
    fail_on_unauthorized: bool,
}

impl<'a> Verifier<'a> {
    pub fn new(classifier: &'a PathClassifier, fail_on_unauthorized: bool) -> Self {
        Self {
            classifier,
            fail_on_unauthorized,
        }
    }

    /// Compare `stored` against `current`, a baseline freshly built from
    /// disk. Refuses to compare across hash algorithms; a digest from one
    /// algorithm says nothing about a digest from another.
    pub fn compare(
        &self,
        stored: &Baseline,
        current: &Baseline,
    ) -> Result<ComparisonReport, EngineError> {
        if stored.hash_algorithm != current.hash_algorithm {
            return Err(EngineError::AlgorithmMismatch {
                stored: stored.hash_algorithm.clone(),
                current: current.hash_algorithm.clone(),
            });
        }

        let mut unchanged = BTreeSet::new();
        let mut modified = BTreeSet::new();
        let mut missing = BTreeSet::new();
        let mut unauthorized = BTreeSet::new();

        for (path, record) in &stored.files {
            match current.files.get(path) {
                Some(live) if live.hash == record.hash => {
                    unchanged.insert(path.clone());
                }
                Some(_) => {
                    modified.insert(path.clone());
                }
                None => match self.classifier.classify(path) {
                    Classification::Excluded | Classification::Whitelisted => {}
                    Classification::Critical | Classification::Normal => {
                        missing.insert(path.clone());
                    }
                },
            }
        }

        for path in current.files.keys() {
            if !stored.files.contains_key(path) {
                unauthorized.insert(path.clone());
            }
        }

        let critical_violations: BTreeSet<String> = modified
            .iter()
            .chain(missing.iter())
            .filter(|p| self.classifier.classify(p) == Classification::Critical)
            .cloned()
            .collect();

        let unauthorized_fails = self.fail_on_unauthorized && !unauthorized.is_empty();
        let overall_status = if modified.is_empty()
            && missing.is_empty()
            && critical_violations.is_empty()
            && !unauthorized_fails
        {
            VerifyStatus::Pass
        } else {
            VerifyStatus::Fail
        };

        Ok(ComparisonReport {
            overall_status,
            unchanged,
            modified,
            missing,
            unauthorized,
            critical_violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::engine::baseline::{FileRecord, Statistics};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(hash: &str) -> FileRecord {
        FileRecord {
            hash: hash.to_string(),
            classification: Classification::Normal,
            size: 1,
        }
    }

    fn baseline(entries: &[(&str, &str)]) -> Baseline {
        let files: BTreeMap<String, FileRecord> = entries
            .iter()
            .map(|(path, hash)| (path.to_string(), record(hash)))
            .collect();
        let total = files.len() as u64;
        Baseline {
            hash_algorithm: "sha256".to_string(),
            generated_at: Utc::now(),
            files,
            statistics: Statistics {
                total_files: total,
                ..Statistics::default()
            },
        }
    }

    fn classifier(rules: &RulesConfig) -> PathClassifier {
        PathClassifier::new(rules).unwrap()
    }

    #[test]
    fn identical_trees_pass() {
        let stored = baseline(&[("a.txt", "h1"), ("b.txt", "h2")]);
        let current = baseline(&[("a.txt", "h1"), ("b.txt", "h2")]);

        let rules = RulesConfig::default();
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert!(report.passed());
        assert_eq!(report.unchanged.len(), 2);
        assert_eq!(report.drift_count(), 0);
    }

    #[test]
    fn modified_missing_and_unauthorized_are_partitioned() {
        let stored = baseline(&[("same.txt", "h1"), ("edited.txt", "h2"), ("gone.txt", "h3")]);
        let current = baseline(&[("same.txt", "h1"), ("edited.txt", "DIFFERENT"), ("new.txt", "h4")]);

        let rules = RulesConfig::default();
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert_eq!(report.overall_status, VerifyStatus::Fail);
        assert!(report.unchanged.contains("same.txt"));
        assert!(report.modified.contains("edited.txt"));
        assert!(report.missing.contains("gone.txt"));
        assert!(report.unauthorized.contains("new.txt"));
        assert!(report.critical_violations.is_empty());
    }

    #[test]
    fn critical_drift_is_called_out() {
        let stored = baseline(&[("secrets.key", "h1"), ("notes.txt", "h2")]);
        let current = baseline(&[("secrets.key", "TAMPERED"), ("notes.txt", "h2")]);

        let rules = RulesConfig {
            critical_patterns: vec!["*.key".into()],
            ..RulesConfig::default()
        };
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert_eq!(report.overall_status, VerifyStatus::Fail);
        assert!(report.critical_violations.contains("secrets.key"));
        assert!(!report.critical_violations.contains("notes.txt"));
    }

    #[test]
    fn missing_critical_file_is_a_critical_violation() {
        let stored = baseline(&[("secrets.key", "h1")]);
        let current = baseline(&[]);

        let rules = RulesConfig {
            critical_patterns: vec!["*.key".into()],
            ..RulesConfig::default()
        };
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert!(report.missing.contains("secrets.key"));
        assert!(report.critical_violations.contains("secrets.key"));
    }

    #[test]
    fn unauthorized_alone_passes_by_default() {
        let stored = baseline(&[("a.txt", "h1")]);
        let current = baseline(&[("a.txt", "h1"), ("stray.txt", "h9")]);

        let rules = RulesConfig::default();
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert!(report.passed());
        assert!(report.unauthorized.contains("stray.txt"));
    }

    #[test]
    fn unauthorized_fails_when_configured_to() {
        let stored = baseline(&[("a.txt", "h1")]);
        let current = baseline(&[("a.txt", "h1"), ("stray.txt", "h9")]);

        let rules = RulesConfig::default();
        let report = Verifier::new(&classifier(&rules), true)
            .compare(&stored, &current)
            .unwrap();

        assert_eq!(report.overall_status, VerifyStatus::Fail);
    }

    #[test]
    fn descoped_paths_are_not_missing() {
        // ephemeral.log was stored before the rules whitelisted it. Today's
        // live scan no longer stores it, which is not drift.
        let stored = baseline(&[("a.txt", "h1"), ("ephemeral.log", "h2")]);
        let current = baseline(&[("a.txt", "h1")]);

        let rules = RulesConfig {
            whitelisted_patterns: vec!["*.log".into()],
            ..RulesConfig::default()
        };
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert!(report.passed());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn algorithm_mismatch_refuses_to_compare() {
        let stored = baseline(&[("a.txt", "h1")]);
        let mut current = baseline(&[("a.txt", "h1")]);
        current.hash_algorithm = "sha512".to_string();

        let rules = RulesConfig::default();
        let err = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap_err();

        assert!(matches!(err, EngineError::AlgorithmMismatch { .. }));
    }

    #[test]
    fn empty_baseline_against_empty_tree_passes() {
        let stored = baseline(&[]);
        let current = baseline(&[]);

        let rules = RulesConfig::default();
        let report = Verifier::new(&classifier(&rules), false)
            .compare(&stored, &current)
            .unwrap();

        assert!(report.passed());
        assert_eq!(report.unchanged.len(), 0);
    }
}
