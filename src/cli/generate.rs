use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::alerts::{self, DriftEvent};
use crate::concurrency::{ScanLock, run_with_deadline};
use crate::config::Config;
use crate::engine::{BaselineBuilder, PathClassifier, ScanScope, store};

#[derive(Args)]
pub struct GenerateArgs {
    /// Directory tree to baseline (overrides config)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Restrict the scan to paths matching these globs
    #[arg(short, long, value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Write the baseline here instead of the default location
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: GenerateArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_from(config_path)?;
    if let Some(root) = args.root {
        config.scan.root = root;
    }

    let lock = ScanLock::new(config.paths.scan_lock())?;
    let _guard = match lock.try_acquire()? {
        Some(guard) => guard,
        None => anyhow::bail!("Another scan is already running"),
    };

    let root = config.scan.root_path();
    let algorithm = config.scan.algorithm()?;
    let limits = config.scan.limits();
    let classifier = PathClassifier::new(&config.rules)?;

    let scope = if args.patterns.is_empty() {
        None
    } else {
        Some(ScanScope::new(&args.patterns)?)
    };

    let builder = BaselineBuilder::new(classifier, algorithm, limits).with_scope(scope);
    let scan_root = root.clone();
    let outcome = run_with_deadline(limits.deadline, move || builder.build(&scan_root))??;

    let output = args.output.unwrap_or_else(|| config.paths.baseline_file());
    store::save(&outcome.baseline, &output)?;

    let stats = outcome.baseline.statistics;
    let note = outcome
        .stopped_early
        .map(|reason| format!("scan stopped early: {reason}"));
    // The baseline is already on disk at this point; a broken event log
    // must not turn a successful generate into a failing exit code.
    let event = DriftEvent::generated("cli", stats, note.clone());
    if let Err(e) = alerts::record(&config, &event) {
        warn!("Failed to record drift event: {}", e);
    }

    println!("Baseline written to {}", output.display());
    println!("  root:        {}", root.display());
    println!("  algorithm:   {}", algorithm);
    println!("  files:       {}", stats.total_files);
    println!("  critical:    {}", stats.critical_files);
    println!("  whitelisted: {}", stats.whitelisted_files);
    println!("  excluded:    {}", stats.excluded_files);
    println!("  skipped:     {}", stats.skipped_files);
    if let Some(note) = note {
        println!("\nWarning: {} (the baseline is partial)", note);
    }

    Ok(())
}
