//! Scheduled background verification.
//!
//! A `ScheduleRunner` re-verifies the monitored tree on a fixed interval,
//! optionally restricted to configured active hours, and records every
//! outcome in the event log.

pub mod runner;

pub use runner::{ScheduleHandle, ScheduleRunner, TickOutcome};
