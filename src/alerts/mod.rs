//! Append-only drift event log.
//!
//! Stored as JSONL in the state directory (one JSON object per line), so
//! external tooling can tail it and old entries never get rewritten. Every
//! generate and verify records an event here; the watch scheduler is the
//! main producer.
//!
//! | Field | Description |
//! |-------|-------------|
//! | `ts` | ISO 8601 timestamp |
//! | `action` | `baseline_generated`, `verify_pass`, `verify_fail`, `verify_error` |
//! | `source` | Who triggered it: `cli` or `scheduler` |
//! | `statistics` | Scan counters, when a scan ran |
//! | `drift` | Modified/missing/unauthorized/critical sets, for verify events |
//! | `detail` | Optional context (partial-scan note, error text) |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::engine::{ComparisonReport, Statistics, VerifyStatus};

/// One recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEvent {
    /// ISO 8601 timestamp of the event.
    pub ts: String,
    /// What happened.
    pub action: EventAction,
    /// Who triggered it: `"cli"` or `"scheduler"`.
    pub source: String,
    /// Scan counters, present when a scan actually ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    /// Drift sets, present for verification events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift: Option<DriftSummary>,
    /// Optional context: partial-scan note, error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Event kinds recorded in the log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A baseline was generated and written.
    BaselineGenerated,
    /// Verification ran and found no drift.
    VerifyPass,
    /// Verification ran and found drift.
    VerifyFail,
    /// Verification could not run (missing baseline, bad config, ...).
    VerifyError,
}

impl EventAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::BaselineGenerated => "baseline_generated",
            EventAction::VerifyPass => "verify_pass",
            EventAction::VerifyFail => "verify_fail",
            EventAction::VerifyError => "verify_error",
        }
    }
}

/// The drift sets of one verification, minus the unchanged bulk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftSummary {
    pub modified: Vec<String>,
    pub missing: Vec<String>,
    pub unauthorized: Vec<String>,
    pub critical_violations: Vec<String>,
}

impl From<&ComparisonReport> for DriftSummary {
    fn from(report: &ComparisonReport) -> Self {
        Self {
            modified: report.modified.iter().cloned().collect(),
            missing: report.missing.iter().cloned().collect(),
            unauthorized: report.unauthorized.iter().cloned().collect(),
            critical_violations: report.critical_violations.iter().cloned().collect(),
        }
    }
}

impl DriftEvent {
    pub fn generated(source: &str, statistics: Statistics, detail: Option<String>) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            action: EventAction::BaselineGenerated,
            source: source.to_string(),
            statistics: Some(statistics),
            drift: None,
            detail,
        }
    }

    pub fn verification(
        source: &str,
        report: &ComparisonReport,
        statistics: Statistics,
        detail: Option<String>,
    ) -> Self {
        let action = match report.overall_status {
            VerifyStatus::Pass => EventAction::VerifyPass,
            VerifyStatus::Fail => EventAction::VerifyFail,
        };
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            action,
            source: source.to_string(),
            statistics: Some(statistics),
            drift: Some(DriftSummary::from(report)),
            detail,
        }
    }

    pub fn error(source: &str, detail: String) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            action: EventAction::VerifyError,
            source: source.to_string(),
            statistics: None,
            drift: None,
            detail: Some(detail),
        }
    }
}

/// Record an event, honoring the `alerts.enabled` switch.
pub fn record(config: &Config, event: &DriftEvent) -> Result<()> {
    if !config.alerts.enabled {
        return Ok(());
    }
    record_event(&config.events_file(), event)
}

/// Append one event to the log at `path`.
pub fn record_event(path: &Path, event: &DriftEvent) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(event).context("Failed to serialize drift event")?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open event log")?;
    writeln!(file, "{}", json).context("Failed to write drift event")?;

    Ok(())
}

/// Read and parse all events from the log at `path`.
///
/// Corrupted lines are skipped (not fatal). Returns an empty vector if the
/// log file does not exist.
pub fn read_events(path: &Path) -> Result<Vec<DriftEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).context("Failed to read event log")?;
    let mut events = Vec::new();

    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        // Skip corrupted lines rather than failing
        if let Ok(event) = serde_json::from_str::<DriftEvent>(line) {
            events.push(event);
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_report(status: VerifyStatus) -> ComparisonReport {
        let mut modified = BTreeSet::new();
        if status == VerifyStatus::Fail {
            modified.insert("etc/app.conf".to_string());
        }
        ComparisonReport {
            overall_status: status,
            unchanged: BTreeSet::new(),
            modified,
            missing: BTreeSet::new(),
            unauthorized: BTreeSet::new(),
            critical_violations: BTreeSet::new(),
        }
    }

    #[test]
    fn events_append_and_read_back_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.jsonl");

        record_event(
            &path,
            &DriftEvent::generated("cli", Statistics::default(), None),
        )
        .unwrap();
        record_event(
            &path,
            &DriftEvent::verification(
                "scheduler",
                &sample_report(VerifyStatus::Fail),
                Statistics::default(),
                None,
            ),
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::BaselineGenerated);
        assert_eq!(events[1].action, EventAction::VerifyFail);
        assert_eq!(
            events[1].drift.as_ref().unwrap().modified,
            vec!["etc/app.conf".to_string()]
        );
    }

    #[test]
    fn passing_verification_records_verify_pass() {
        let event = DriftEvent::verification(
            "cli",
            &sample_report(VerifyStatus::Pass),
            Statistics::default(),
            None,
        );
        assert_eq!(event.action, EventAction::VerifyPass);
    }

    #[test]
    fn actions_serialize_snake_case_and_none_fields_are_omitted() {
        let event = DriftEvent::error("scheduler", "baseline file not found".to_string());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"verify_error\""));
        assert!(json.contains("baseline file not found"));
        assert!(!json.contains("\"statistics\""));
        assert!(!json.contains("\"drift\""));
    }

    #[test]
    fn corrupted_lines_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.jsonl");

        record_event(
            &path,
            &DriftEvent::generated("cli", Statistics::default(), None),
        )
        .unwrap();
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not valid json garbage").unwrap();
        drop(file);
        record_event(
            &path,
            &DriftEvent::error("scheduler", "oops".to_string()),
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let events = read_events(&tmp.path().join("absent.jsonl")).unwrap();
        assert!(events.is_empty());
    }
}
