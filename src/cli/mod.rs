pub mod config;
pub mod events;
pub mod generate;
pub mod paths;
pub mod rules;
pub mod verify;
pub mod watch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(author, version, about = "File integrity monitoring for developer workstations")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "DRIFTWATCH_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the monitored tree and store a fresh baseline
    Generate(generate::GenerateArgs),

    /// Re-scan and compare against the stored baseline
    Verify(verify::VerifyArgs),

    /// Whitelist patterns: expected to churn, never stored or reported
    Whitelist(rules::WhitelistArgs),

    /// Mark patterns critical: drift there is a critical violation
    Critical(rules::CriticalArgs),

    /// Verify on a schedule in the foreground
    Watch(watch::WatchArgs),

    /// Show recorded drift events
    Events(events::EventsArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Show resolved XDG directory paths
    Paths,
}
