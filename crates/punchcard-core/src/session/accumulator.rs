//! Time accumulation: worked, break and overtime seconds.
//!
//! Everything here is a pure function of absolute timestamps. There is no
//! incremented counter anywhere -- a display that was suspended for an hour
//! computes the same value as one that ticked the whole time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ledger::BreakLedger;

/// Standard workday in seconds (8h). Time worked beyond this is overtime.
pub const STANDARD_WORK_SECS: u64 = 8 * 3600;

/// Derived session metrics. Never persisted, recomputed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub worked_secs: u64,
    pub break_secs: u64,
    pub overtime_secs: u64,
}

impl Metrics {
    /// Worked plus break time, the wall-clock span of the session so far.
    pub fn total_secs(&self) -> u64 {
        self.worked_secs + self.break_secs
    }

    pub fn worked_hms(&self) -> String {
        format_hms(self.worked_secs)
    }

    pub fn break_hms(&self) -> String {
        format_hms(self.break_secs)
    }

    pub fn overtime_hms(&self) -> String {
        format_hms(self.overtime_secs)
    }
}

/// Seconds worked as of `now`, clamped to >= 0 against clock skew.
///
/// A completed session (`clock_out` present) is measured to its clock-out
/// instant instead of `now`, so its metrics freeze once it ends.
pub fn worked_seconds(
    session_start: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    ledger: &BreakLedger,
    now: DateTime<Utc>,
) -> u64 {
    let Some(start) = session_start else {
        return 0;
    };
    let end = clock_out.unwrap_or(now);
    let worked = (end - start) - ledger.total_at(end);
    worked.num_seconds().max(0) as u64
}

/// Seconds of break as of `now`, frozen at clock-out for completed sessions.
pub fn break_seconds(
    session_start: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    ledger: &BreakLedger,
    now: DateTime<Utc>,
) -> u64 {
    if session_start.is_none() {
        return 0;
    }
    let end = clock_out.unwrap_or(now);
    ledger.total_at(end).num_seconds().max(0) as u64
}

pub fn overtime_seconds(worked_secs: u64, standard_work_secs: u64) -> u64 {
    worked_secs.saturating_sub(standard_work_secs)
}

/// Compute the full metrics snapshot for a session as of `now`.
pub fn metrics(
    session_start: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    ledger: &BreakLedger,
    now: DateTime<Utc>,
    standard_work_secs: u64,
) -> Metrics {
    let worked_secs = worked_seconds(session_start, clock_out, ledger, now);
    Metrics {
        worked_secs,
        break_secs: break_seconds(session_start, clock_out, ledger, now),
        overtime_secs: overtime_seconds(worked_secs, standard_work_secs),
    }
}

/// Render seconds as `HH:MM:SS`.
pub fn format_hms(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hrs:02}:{mins:02}:{secs:02}")
}
