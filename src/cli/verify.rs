use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::alerts::{self, DriftEvent};
use crate::concurrency::{ScanLock, run_with_deadline};
use crate::config::Config;
use crate::engine::{BaselineBuilder, ComparisonReport, PathClassifier, Verifier, VerifyStatus, store};

/// Clean verification.
pub const EXIT_PASS: i32 = 0;
/// Drift detected.
pub const EXIT_DRIFT: i32 = 1;
/// Verification could not run at all.
pub const EXIT_ERROR: i32 = 2;

#[derive(Args)]
pub struct VerifyArgs {
    /// Verify against this baseline instead of the default location
    #[arg(short, long)]
    pub baseline: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Returns the process exit code instead of propagating errors, so a
/// scripted `driftwatch verify` can distinguish "drift" from "broken".
pub fn run(args: VerifyArgs, config_path: Option<&Path>) -> i32 {
    let config = match Config::load_from(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return EXIT_ERROR;
        }
    };

    match execute(&args, &config) {
        Ok(report) => match report.overall_status {
            VerifyStatus::Pass => EXIT_PASS,
            VerifyStatus::Fail => EXIT_DRIFT,
        },
        Err(e) => {
            eprintln!("error: {:#}", e);
            let event = DriftEvent::error("cli", format!("{:#}", e));
            if let Err(e) = alerts::record(&config, &event) {
                warn!("Failed to record drift event: {}", e);
            }
            EXIT_ERROR
        }
    }
}

fn execute(args: &VerifyArgs, config: &Config) -> Result<ComparisonReport> {
    let lock = ScanLock::new(config.paths.scan_lock())?;
    let _guard = match lock.try_acquire()? {
        Some(guard) => guard,
        None => anyhow::bail!("Another scan is already running"),
    };

    let baseline_path = args
        .baseline
        .clone()
        .unwrap_or_else(|| config.paths.baseline_file());
    let stored = store::load(&baseline_path)?;

    let classifier = PathClassifier::new(&config.rules)?;
    let algorithm = config.scan.algorithm()?;
    let limits = config.scan.limits();
    let root = config.scan.root_path();

    let builder = BaselineBuilder::new(classifier.clone(), algorithm, limits);
    let outcome = run_with_deadline(limits.deadline, move || builder.build(&root))??;

    let verifier = Verifier::new(&classifier, config.verify.fail_on_unauthorized);
    let report = verifier.compare(&stored, &outcome.baseline)?;

    let note = outcome
        .stopped_early
        .map(|reason| format!("scan stopped early: {reason}"));
    let event = DriftEvent::verification("cli", &report, outcome.baseline.statistics, note.clone());
    if let Err(e) = alerts::record(config, &event) {
        warn!("Failed to record drift event: {}", e);
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report, note.as_deref()),
    }

    Ok(report)
}

fn print_report(report: &ComparisonReport, note: Option<&str>) {
    print_section("Modified", 'M', &report.modified);
    print_section("Missing", 'D', &report.missing);
    print_section("Unauthorized", 'A', &report.unauthorized);
    print_section("Critical violations", '!', &report.critical_violations);

    if let Some(note) = note {
        println!("Warning: {} (results may be incomplete)", note);
        println!();
    }

    match report.overall_status {
        VerifyStatus::Pass => {
            println!("PASS: {} files verified, no drift", report.unchanged.len());
        }
        VerifyStatus::Fail => {
            println!(
                "FAIL: {} drifted, {} unchanged",
                report.drift_count(),
                report.unchanged.len()
            );
        }
    }
}

fn print_section(title: &str, marker: char, paths: &std::collections::BTreeSet<String>) {
    if paths.is_empty() {
        return;
    }
    println!("{} ({}):", title, paths.len());
    for path in paths {
        println!("  {} {}", marker, path);
    }
    println!();
}
