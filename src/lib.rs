//! Driftwatch - file integrity monitoring for developer workstations
//!
//! This crate provides the core functionality for Driftwatch, including:
//! - Baseline engine: classify, enumerate, hash, store, compare
//! - Bounded scans with a wall-clock deadline and an item cap
//! - Schedule runner for periodic background verification
//! - Append-only JSONL event log for drift alerts

pub mod alerts;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod paths;
pub mod scheduler;

pub use config::Config;
