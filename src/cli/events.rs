use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::alerts::{self, DriftEvent};
use crate::config::Config;

#[derive(Args)]
pub struct EventsArgs {
    /// Show at most this many of the most recent events
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn run(args: EventsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_from(config_path)?;
    let events = alerts::read_events(&config.events_file())?;

    let start = events.len().saturating_sub(args.limit);
    let recent = &events[start..];

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(recent)?),
        _ => {
            if recent.is_empty() {
                println!("No events recorded");
                return Ok(());
            }
            for event in recent {
                println!("{}", format_event(event));
            }
        }
    }

    Ok(())
}

fn format_event(event: &DriftEvent) -> String {
    let mut summary = String::new();

    if let Some(stats) = &event.statistics {
        summary = format!("{} files", stats.total_files);
    }
    if let Some(drift) = &event.drift {
        summary = format!(
            "modified {}, missing {}, unauthorized {}, critical {}",
            drift.modified.len(),
            drift.missing.len(),
            drift.unauthorized.len(),
            drift.critical_violations.len()
        );
    }
    if let Some(detail) = &event.detail {
        if summary.is_empty() {
            summary = detail.clone();
        } else {
            summary = format!("{} ({})", summary, detail);
        }
    }

    format!(
        "{}  {:<18}  {:<9}  {}",
        event.ts,
        event.action.as_str(),
        event.source,
        summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::EventAction;

    #[test]
    fn formats_a_generate_event_on_one_line() {
        let event = DriftEvent {
            ts: "2025-06-01T10:00:00+00:00".to_string(),
            action: EventAction::BaselineGenerated,
            source: "cli".to_string(),
            statistics: Some(crate::engine::Statistics {
                total_files: 42,
                ..Default::default()
            }),
            drift: None,
            detail: None,
        };

        let line = format_event(&event);
        assert!(line.contains("baseline_generated"));
        assert!(line.contains("42 files"));
    }

    #[test]
    fn drift_counts_win_over_statistics_in_the_summary() {
        let event = DriftEvent {
            ts: "2025-06-01T10:00:00+00:00".to_string(),
            action: EventAction::VerifyFail,
            source: "scheduler".to_string(),
            statistics: Some(crate::engine::Statistics::default()),
            drift: Some(crate::alerts::DriftSummary {
                modified: vec!["a.py".to_string()],
                ..Default::default()
            }),
            detail: None,
        };

        let line = format_event(&event);
        assert!(line.contains("modified 1"));
    }
}
