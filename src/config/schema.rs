//! Parsing helpers for human-entered config values.

use anyhow::{Result, bail};
use std::time::Duration;

/// Parse a duration like "90s", "30m", "2h", or "1d".
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let (num, mult) = if let Some(rest) = s.strip_suffix('s') {
        (rest, 1)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3600)
    } else if let Some(rest) = s.strip_suffix('d') {
        (rest, 86400)
    } else {
        (s, 1)
    };

    let value: u64 = num.trim().parse().map_err(|_| {
        anyhow::anyhow!("invalid duration {s:?}, expected forms like \"90s\", \"30m\", \"2h\"")
    })?;
    if value == 0 {
        bail!("duration must be positive: {s:?}");
    }

    Ok(Duration::from_secs(value * mult))
}

/// Parse a wall-clock time like "09:00" or "22:30" into (hour, minute).
pub fn parse_time(s: &str) -> Result<(u32, u32)> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid time {s:?}, expected HH:MM"))?;

    let hour: u32 = h
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in {s:?}"))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in {s:?}"))?;

    if hour > 23 || minute > 59 {
        bail!("time out of range: {s:?}");
    }

    Ok((hour, minute))
}
