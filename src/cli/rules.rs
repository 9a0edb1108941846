use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::config::{Config, RuleKind};

#[derive(Args)]
pub struct WhitelistArgs {
    /// Glob patterns to whitelist (e.g. "**/*.log" "cache/**")
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

#[derive(Args)]
pub struct CriticalArgs {
    /// Glob patterns to mark critical (e.g. "*.key" ".env")
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

pub fn run_whitelist(args: WhitelistArgs, config_path: Option<&Path>) -> Result<()> {
    add(RuleKind::Whitelisted, &args.patterns, config_path)
}

pub fn run_critical(args: CriticalArgs, config_path: Option<&Path>) -> Result<()> {
    add(RuleKind::Critical, &args.patterns, config_path)
}

fn add(kind: RuleKind, patterns: &[String], config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_from(config_path)?;
    let added = config.add_patterns(kind, patterns)?;
    config.save()?;

    println!("Added {} {} pattern(s)", added, kind.as_str());
    let skipped = patterns.len() - added;
    if skipped > 0 {
        println!("Skipped {} already present", skipped);
    }
    if added > 0 {
        println!("Run `driftwatch generate` to rebuild the baseline under the new rules");
    }

    Ok(())
}
