//! In-process attendance store.
//!
//! Implements the same command semantics as the remote API against a record
//! held in memory. Backs the CLI's offline demo mode and the test suites;
//! tests can inject a failure for the next command to exercise error paths.

use std::sync::{Arc, Mutex};

use super::types::{AttendanceRecord, ManualClockOut};
use super::AttendanceStore;
use crate::clock::Clock;
use crate::error::StoreError;
use crate::session::BreakInterval;

pub struct InMemoryStore {
    clock: Arc<dyn Clock>,
    record: Mutex<Option<AttendanceRecord>>,
    fail_next: Mutex<Option<StoreError>>,
    calls: Mutex<Vec<&'static str>>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            record: Mutex::new(None),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next command fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Seed the canonical record directly, bypassing the command flow.
    pub fn seed(&self, record: Option<AttendanceRecord>) {
        *self.record.lock().unwrap() = record;
    }

    /// Names of the commands issued so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn begin(&self, name: &'static str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(name);
        match self.fail_next.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AttendanceStore for InMemoryStore {
    async fn clock_in(&self) -> Result<(), StoreError> {
        self.begin("clock_in")?;
        let mut record = self.record.lock().unwrap();
        if record.as_ref().is_some_and(AttendanceRecord::is_open) {
            return Err(StoreError::Rejected("already clocked in".into()));
        }
        *record = Some(AttendanceRecord {
            clock_in: self.clock.now(),
            clock_out: None,
            breaks: Vec::new(),
        });
        Ok(())
    }

    async fn clock_out(&self) -> Result<(), StoreError> {
        self.begin("clock_out")?;
        let now = self.clock.now();
        let mut record = self.record.lock().unwrap();
        let Some(current) = record.as_mut().filter(|r| r.is_open()) else {
            return Err(StoreError::Rejected("no open session".into()));
        };
        if let Some(open) = current.breaks.iter_mut().find(|b| b.end.is_none()) {
            open.end = Some(now);
        }
        current.clock_out = Some(now);
        Ok(())
    }

    async fn take_break(&self) -> Result<(), StoreError> {
        self.begin("take_break")?;
        let now = self.clock.now();
        let mut record = self.record.lock().unwrap();
        let Some(current) = record.as_mut().filter(|r| r.is_open()) else {
            return Err(StoreError::Rejected("no open session".into()));
        };
        if current.breaks.iter().any(|b| b.end.is_none()) {
            return Err(StoreError::Rejected("a break is already open".into()));
        }
        current.breaks.push(BreakInterval {
            start: now,
            end: None,
        });
        Ok(())
    }

    async fn resume_work(&self) -> Result<(), StoreError> {
        self.begin("resume_work")?;
        let now = self.clock.now();
        let mut record = self.record.lock().unwrap();
        let open = record
            .as_mut()
            .filter(|r| r.is_open())
            .and_then(|r| r.breaks.iter_mut().find(|b| b.end.is_none()));
        match open {
            Some(interval) => {
                interval.end = Some(now);
                Ok(())
            }
            None => Err(StoreError::Rejected("no open break".into())),
        }
    }

    async fn fetch_attendance(&self) -> Result<Option<AttendanceRecord>, StoreError> {
        self.begin("fetch_attendance")?;
        Ok(self.record.lock().unwrap().clone())
    }

    async fn manual_clock_out(&self, correction: &ManualClockOut) -> Result<(), StoreError> {
        self.begin("manual_clock_out")?;
        let mut record = self.record.lock().unwrap();
        let Some(current) = record.as_mut().filter(|r| r.is_open()) else {
            return Err(StoreError::Rejected("no open session to correct".into()));
        };
        if let Some(open) = current.breaks.iter_mut().find(|b| b.end.is_none()) {
            open.end = Some(correction.clock_out_time);
        }
        current.clock_out = Some(correction.clock_out_time);
        Ok(())
    }
}
