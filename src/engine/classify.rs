//! Path classification against the configured glob rules.
//!
//! All matching happens on slash-separated paths relative to the scan root,
//! so rules written on one machine behave the same on another.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use super::EngineError;
use crate::config::RulesConfig;

/// `*` stays within one path segment; spanning directories takes `**`.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// How a relative path participates in baselines and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Never enters the baseline and never counts as drift.
    Excluded,
    /// Hashed and stored; drift here is flagged as a critical violation.
    Critical,
    /// Expected to churn. Enumerated and counted, but never hashed or stored.
    Whitelisted,
    /// Hashed and stored.
    Normal,
}

/// Compiled classifier, built once per run from [`RulesConfig`].
///
/// Precedence is fixed: excluded beats critical beats whitelisted beats
/// normal. A path matching both an excluded and a critical pattern is
/// excluded.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    excluded: Vec<Pattern>,
    critical: Vec<Pattern>,
    whitelisted: Vec<Pattern>,
}

impl PathClassifier {
    /// Compile all three pattern lists, failing on the first invalid glob so
    /// a bad config surfaces before any filesystem work starts.
    pub fn new(rules: &RulesConfig) -> Result<Self, EngineError> {
        Ok(Self {
            excluded: compile_patterns(&rules.excluded_patterns)?,
            critical: compile_patterns(&rules.critical_patterns)?,
            whitelisted: compile_patterns(&rules.whitelisted_patterns)?,
        })
    }

    /// Classify a slash-separated path relative to the scan root.
    pub fn classify(&self, rel_path: &str) -> Classification {
        if matches_any(&self.excluded, rel_path) {
            Classification::Excluded
        } else if matches_any(&self.critical, rel_path) {
            Classification::Critical
        } else if matches_any(&self.whitelisted, rel_path) {
            Classification::Whitelisted
        } else {
            Classification::Normal
        }
    }
}

/// Optional include filter for partial scans (`generate --patterns`).
///
/// Scope narrows which paths are considered at all. Classification still
/// applies to everything the scope admits.
#[derive(Debug, Clone)]
pub struct ScanScope {
    patterns: Vec<Pattern>,
}

impl ScanScope {
    pub fn new(globs: &[String]) -> Result<Self, EngineError> {
        Ok(Self {
            patterns: compile_patterns(globs)?,
        })
    }

    pub fn admits(&self, rel_path: &str) -> bool {
        matches_any(&self.patterns, rel_path)
    }
}

/// Check a batch of glob strings without keeping the compiled form.
pub fn validate_patterns(globs: &[String]) -> Result<(), EngineError> {
    compile_patterns(globs).map(|_| ())
}

fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>, EngineError> {
    globs
        .iter()
        .map(|g| {
            Pattern::new(g).map_err(|e| EngineError::InvalidPattern {
                pattern: g.clone(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

fn matches_any(patterns: &[Pattern], rel_path: &str) -> bool {
    patterns.iter().any(|p| p.matches_with(rel_path, GLOB_OPTIONS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(excluded: &[&str], critical: &[&str], whitelisted: &[&str]) -> RulesConfig {
        RulesConfig {
            excluded_patterns: excluded.iter().map(|s| s.to_string()).collect(),
            critical_patterns: critical.iter().map(|s| s.to_string()).collect(),
            whitelisted_patterns: whitelisted.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_rules_classify_everything_normal() {
        let c = PathClassifier::new(&rules(&[], &[], &[])).unwrap();
        assert_eq!(c.classify("src/main.rs"), Classification::Normal);
        assert_eq!(c.classify("deeply/nested/thing.bin"), Classification::Normal);
    }

    #[test]
    fn precedence_excluded_beats_critical_beats_whitelisted() {
        let c = PathClassifier::new(&rules(
            &["build/**"],
            &["build/**", "secrets/*"],
            &["secrets/*", "*.log"],
        ))
        .unwrap();

        // Matches excluded and critical: excluded wins.
        assert_eq!(c.classify("build/output.bin"), Classification::Excluded);
        // Matches critical and whitelisted: critical wins.
        assert_eq!(c.classify("secrets/api.key"), Classification::Critical);
        // Matches only whitelisted.
        assert_eq!(c.classify("debug.log"), Classification::Whitelisted);
        // Matches nothing.
        assert_eq!(c.classify("README.md"), Classification::Normal);
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let c = PathClassifier::new(&rules(&[], &[], &["*.log"])).unwrap();
        assert_eq!(c.classify("debug.log"), Classification::Whitelisted);
        assert_eq!(c.classify("logs/debug.log"), Classification::Normal);
    }

    #[test]
    fn double_star_crosses_directories() {
        let c = PathClassifier::new(&rules(&[], &["**/*.key"], &[])).unwrap();
        assert_eq!(c.classify("a/b/c/server.key"), Classification::Critical);
        assert_eq!(c.classify("a/server.key"), Classification::Critical);
    }

    #[test]
    fn invalid_pattern_is_rejected_up_front() {
        let err = PathClassifier::new(&rules(&["[unclosed"], &[], &[])).unwrap_err();
        match err {
            EngineError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn scope_admits_only_matching_paths() {
        let scope = ScanScope::new(&["src/**".to_string(), "Cargo.toml".to_string()]).unwrap();
        assert!(scope.admits("src/engine/walk.rs"));
        assert!(scope.admits("Cargo.toml"));
        assert!(!scope.admits("target/debug/build.out"));
    }

    #[test]
    fn validate_patterns_reports_the_offending_glob() {
        let globs = vec!["ok/**".to_string(), "a[".to_string()];
        let err = validate_patterns(&globs).unwrap_err();
        assert!(err.to_string().contains("a["));
    }
}
