use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use driftwatch::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_override = cli.config.map(PathBuf::from);
    let config_path = config_override.as_deref();

    match cli.command {
        Commands::Generate(args) => cli::generate::run(args, config_path),
        Commands::Verify(args) => std::process::exit(cli::verify::run(args, config_path)),
        Commands::Whitelist(args) => cli::rules::run_whitelist(args, config_path),
        Commands::Critical(args) => cli::rules::run_critical(args, config_path),
        Commands::Watch(args) => cli::watch::run(args, config_path),
        Commands::Events(args) => cli::events::run(args, config_path),
        Commands::Config(args) => cli::config::run(args, config_path),
        Commands::Paths => cli::paths::run(),
    }
}
