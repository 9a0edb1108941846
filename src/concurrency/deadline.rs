//! Deadline supervision for scan work.
//!
//! The scan checks its own deadline between files, which bounds normal
//! operation. A pathological filesystem (dead network mount, wedged FUSE
//! driver) can stall a single read indefinitely, so the scan runs on a
//! worker thread while the control thread waits out the deadline plus a
//! grace period. A worker that misses even the grace period is abandoned,
//! not killed; killing a thread mid-read risks corrupting whatever handle
//! it holds.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::engine::EngineError;

/// Extra wait past the deadline before the worker is declared stalled.
const GRACE: Duration = Duration::from_secs(5);

/// Run `task` on a worker thread, waiting at most `budget` plus grace.
pub fn run_with_deadline<T, F>(budget: Duration, task: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    run_with_grace(budget, GRACE, task)
}

fn run_with_grace<T, F>(budget: Duration, grace: Duration, task: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(task());
    });

    match rx.recv_timeout(budget + grace) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(
                budget_secs = budget.as_secs(),
                grace_secs = grace.as_secs(),
                "abandoning stalled scan worker"
            );
            Err(EngineError::WorkerStalled)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!("scan worker exited without producing a result");
            Err(EngineError::WorkerStalled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_task_returns_its_value() {
        let result = run_with_deadline(Duration::from_secs(5), || 41 + 1).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn result_type_passes_through() {
        let result: Result<Result<u32, String>, EngineError> =
            run_with_deadline(Duration::from_secs(5), || Err("inner".to_string()));
        assert_eq!(result.unwrap(), Err("inner".to_string()));
    }

    #[test]
    fn stalled_task_is_abandoned() {
        let err = run_with_grace(Duration::ZERO, Duration::from_millis(50), || {
            thread::sleep(Duration::from_secs(2));
            0u8
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::WorkerStalled));
    }

    #[test]
    fn panicking_task_does_not_hang_the_caller() {
        let err = run_with_grace(Duration::from_secs(5), Duration::from_secs(5), || -> u8 {
            panic!("scan blew up")
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::WorkerStalled));
    }
}
