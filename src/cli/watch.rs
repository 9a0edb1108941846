use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::config::Config;
use crate::scheduler::{ScheduleRunner, TickOutcome};

#[derive(Args)]
pub struct WatchArgs {
    /// Run a single verification tick and exit
    #[arg(long)]
    pub once: bool,
}

pub fn run(args: WatchArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_from(config_path)?;
    let runner = ScheduleRunner::new(&config)?;

    if args.once {
        return match runner.run_once() {
            TickOutcome::Verified(status) => {
                println!("Verification finished: {}", status);
                Ok(())
            }
            TickOutcome::SkippedLocked => {
                println!("Skipped: another scan is running");
                Ok(())
            }
            TickOutcome::SkippedNoBaseline => {
                println!("Skipped: no baseline yet (run `driftwatch generate` first)");
                Ok(())
            }
            TickOutcome::Failed(message) => anyhow::bail!(message),
        };
    }

    if !config.schedule.enabled {
        anyhow::bail!("Scheduled verification is disabled (set schedule.enabled = true)");
    }

    println!(
        "Watching {} every {}",
        config.scan.root_path().display(),
        config.schedule.interval
    );
    if let Some(hours) = &config.schedule.active_hours {
        println!("Active hours: {} to {}", hours.start, hours.end);
    }
    println!("Press Ctrl+C to stop\n");

    runner.run()
}
