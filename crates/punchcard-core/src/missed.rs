//! Missed clock-out detection and manual correction.
//!
//! A session left open past the staleness threshold is flagged once and a
//! correction prompt stays pending until the store accepts a manual
//! clock-out carrying the corrected timestamp and a reason.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::session::machine::SessionEngine;
use crate::store::{AttendanceRecord, AttendanceStore, ManualClockOut};

/// Sessions still open after this many hours have missed their clock-out.
pub const DEFAULT_MISSED_CLOCK_OUT_AFTER_HOURS: i64 = 12;

/// A stale open session awaiting manual correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissedClockOut {
    pub clock_in: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
}

/// Flags stale open sessions, prompting once per session.
#[derive(Debug)]
pub struct MissedClockOutResolver {
    threshold: Duration,
    /// Session start already prompted for; suppresses duplicate prompts
    /// across detection cycles.
    prompted_for: Option<DateTime<Utc>>,
    pending: Option<MissedClockOut>,
}

impl MissedClockOutResolver {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            prompted_for: None,
            pending: None,
        }
    }

    /// Inspect a fetched record. Returns the correction prompt the first
    /// time a stale open session is seen.
    pub fn observe(
        &mut self,
        record: Option<&AttendanceRecord>,
        now: DateTime<Utc>,
    ) -> Option<MissedClockOut> {
        let Some(record) = record.filter(|r| r.is_open()) else {
            // Session completed or absent: nothing left to correct.
            self.pending = None;
            self.prompted_for = None;
            return None;
        };
        if now - record.clock_in <= self.threshold {
            return None;
        }
        if self.prompted_for == Some(record.clock_in) {
            return None;
        }
        warn!(clock_in = %record.clock_in, "missed clock-out detected");
        self.prompted_for = Some(record.clock_in);
        let missed = MissedClockOut {
            clock_in: record.clock_in,
            detected_at: now,
        };
        self.pending = Some(missed);
        Some(missed)
    }

    /// The prompt still awaiting a correction, if any.
    pub fn pending(&self) -> Option<MissedClockOut> {
        self.pending
    }

    /// Clear the pending prompt after the store accepted a correction.
    pub fn resolve(&mut self) {
        self.pending = None;
    }
}

impl<S: AttendanceStore> SessionEngine<S> {
    /// The stale-session prompt awaiting a correction, if one is pending.
    pub fn missed_clock_out(&self) -> Option<MissedClockOut> {
        self.resolver.lock().unwrap().pending()
    }

    /// Submit a manual clock-out correction. The store is the final
    /// arbiter of acceptance; the corrected timestamp is forwarded as-is.
    pub async fn submit_manual_clock_out(
        &self,
        correction: ManualClockOut,
    ) -> Result<(), EngineError> {
        self.store.manual_clock_out(&correction).await?;
        info!(clock_out = %correction.clock_out_time, "manual clock-out accepted");
        self.resolver.lock().unwrap().resolve();
        self.refresh().await;
        Ok(())
    }
}
