//! Schedule runner for periodic background verification

use anyhow::Result;
use chrono::{Local, NaiveTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::alerts::{self, DriftEvent};
use crate::concurrency::{ScanLock, run_with_deadline};
use crate::config::{Config, parse_duration, parse_time};
use crate::engine::{
    BaselineBuilder, EngineError, PathClassifier, Verifier, VerifyStatus, store,
};

pub struct ScheduleRunner {
    config: Config,
    interval: Duration,
    active_hours: Option<(NaiveTime, NaiveTime)>,
    scan_lock: ScanLock,
}

/// What one scheduled tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Verified(VerifyStatus),
    /// Another process holds the scan lock; its run covers this tick.
    SkippedLocked,
    /// No baseline exists yet, so there is nothing to verify against.
    SkippedNoBaseline,
    Failed(String),
}

/// Handle to a background watch loop.
///
/// Stopping consumes the handle, so a stopped loop can be neither stopped
/// twice nor poked afterwards.
pub struct ScheduleHandle {
    stop: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl ScheduleHandle {
    /// Signal the loop to stop and wait for it to wind down.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.thread.join();
    }
}

impl ScheduleRunner {
    pub fn new(config: &Config) -> Result<Self> {
        let interval = parse_duration(&config.schedule.interval)
            .map_err(|e| anyhow::anyhow!("Invalid schedule interval: {}", e))?;

        let active_hours = if let Some(ref hours) = config.schedule.active_hours {
            let (start_h, start_m) = parse_time(&hours.start)
                .map_err(|e| anyhow::anyhow!("Invalid start time: {}", e))?;
            let (end_h, end_m) =
                parse_time(&hours.end).map_err(|e| anyhow::anyhow!("Invalid end time: {}", e))?;

            Some((
                NaiveTime::from_hms_opt(start_h, start_m, 0).unwrap(),
                NaiveTime::from_hms_opt(end_h, end_m, 0).unwrap(),
            ))
        } else {
            None
        };

        let scan_lock = ScanLock::new(config.paths.scan_lock())?;

        Ok(Self {
            config: config.clone(),
            interval,
            active_hours,
            scan_lock,
        })
    }

    /// Run the watch loop on the calling thread, forever.
    pub fn run(&self) -> Result<()> {
        info!("Starting watch loop with interval: {:?}", self.interval);

        loop {
            thread::sleep(self.interval);

            if !self.in_active_hours() {
                debug!("Outside active hours, skipping verification");
                continue;
            }

            self.run_once();
        }
    }

    /// Spawn the watch loop on a background thread.
    ///
    /// The returned handle is the only way to stop the loop.
    pub fn start(self) -> ScheduleHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = thread::spawn(move || {
            info!("Starting watch loop with interval: {:?}", self.interval);

            while !flag.load(Ordering::SeqCst) {
                if !sleep_interruptibly(self.interval, &flag) {
                    break;
                }
                if !self.in_active_hours() {
                    debug!("Outside active hours, skipping verification");
                    continue;
                }
                self.run_once();
            }
            info!("Watch loop stopped");
        });

        ScheduleHandle { stop, thread }
    }

    /// Run a single verification tick.
    pub fn run_once(&self) -> TickOutcome {
        // Non-blocking: a CLI run or another watcher already scanning
        // makes this tick redundant.
        let _guard = match self.scan_lock.try_acquire() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("Skipping verification: scan lock held by another process");
                return TickOutcome::SkippedLocked;
            }
            Err(e) => return self.failed(format!("scan lock: {e}")),
        };

        let start = Instant::now();
        match self.verify_once() {
            Ok(Some(status)) => {
                debug!(elapsed_ms = start.elapsed().as_millis() as u64, %status, "tick finished");
                TickOutcome::Verified(status)
            }
            Ok(None) => {
                debug!("No baseline yet; nothing to verify");
                TickOutcome::SkippedNoBaseline
            }
            Err(e) => self.failed(format!("{:#}", e)),
        }
    }

    /// One verification pass. `Ok(None)` means no baseline exists yet.
    fn verify_once(&self) -> Result<Option<VerifyStatus>> {
        let baseline_path = self.config.paths.baseline_file();
        let stored = match store::load(&baseline_path) {
            Ok(baseline) => baseline,
            Err(EngineError::BaselineMissing(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let classifier = PathClassifier::new(&self.config.rules)?;
        let algorithm = self.config.scan.algorithm()?;
        let limits = self.config.scan.limits();
        let root = self.config.scan.root_path();

        let builder = BaselineBuilder::new(classifier.clone(), algorithm, limits);
        let outcome = run_with_deadline(limits.deadline, move || builder.build(&root))??;

        let verifier = Verifier::new(&classifier, self.config.verify.fail_on_unauthorized);
        let report = verifier.compare(&stored, &outcome.baseline)?;

        let detail = outcome
            .stopped_early
            .map(|reason| format!("scan stopped early: {reason}"));
        let event = DriftEvent::verification(
            "scheduler",
            &report,
            outcome.baseline.statistics,
            detail,
        );
        if let Err(e) = alerts::record(&self.config, &event) {
            warn!("Failed to record drift event: {}", e);
        }

        match report.overall_status {
            VerifyStatus::Pass => {
                info!(
                    unchanged = report.unchanged.len(),
                    "Scheduled verification passed"
                );
            }
            VerifyStatus::Fail => {
                warn!(
                    modified = report.modified.len(),
                    missing = report.missing.len(),
                    unauthorized = report.unauthorized.len(),
                    critical = report.critical_violations.len(),
                    "Scheduled verification FAILED"
                );
            }
        }

        Ok(Some(report.overall_status))
    }

    fn failed(&self, message: String) -> TickOutcome {
        warn!("Scheduled verification error: {}", message);
        let event = DriftEvent::error("scheduler", message.clone());
        if let Err(e) = alerts::record(&self.config, &event) {
            warn!("Failed to record drift event: {}", e);
        }
        TickOutcome::Failed(message)
    }

    fn in_active_hours(&self) -> bool {
        let Some((start, end)) = self.active_hours else {
            return true; // No active hours configured, always active
        };
        within_hours(Local::now().time(), start, end)
    }
}

/// Active-hours check, overnight ranges included.
fn within_hours(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        // Normal range (e.g., 09:00 to 22:00)
        now >= start && now <= end
    } else {
        // Overnight range (e.g., 22:00 to 06:00)
        now >= start || now <= end
    }
}

/// Sleep in slices so a stop request interrupts promptly.
/// Returns false if stopped mid-sleep.
fn sleep_interruptibly(total: Duration, stop: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let deadline = Instant::now() + total;
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLICE.min(deadline.duration_since(now)));
    }
}
