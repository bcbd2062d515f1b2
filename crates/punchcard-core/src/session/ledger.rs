//! Break ledger: the ordered record of break intervals within a session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// A bounded (or currently open) span of non-working time.
///
/// An absent `end` marks the single currently-open interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl BreakInterval {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Duration of the interval, measured to `now` while it is open.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end.unwrap_or(now);
        (end - self.start).max(Duration::zero())
    }
}

/// Ordered sequence of break intervals.
///
/// Insertion order is chronological order. Invariant: at most one interval
/// is open at any time, and if one is open it is the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakLedger {
    intervals: Vec<BreakInterval>,
}

impl BreakLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger verbatim from fetched intervals, validating the
    /// single-open-interval invariant and interval ordering.
    pub fn from_intervals(intervals: Vec<BreakInterval>) -> Result<Self, DataError> {
        let mut open_seen = false;
        for interval in &intervals {
            if open_seen {
                // Something follows the open interval.
                return if interval.is_open() {
                    Err(DataError::MultipleOpenBreaks)
                } else {
                    Err(DataError::OpenBreakNotLast)
                };
            }
            match interval.end {
                Some(end) if end < interval.start => {
                    return Err(DataError::NegativeInterval {
                        start: interval.start,
                        end,
                    });
                }
                Some(_) => {}
                None => open_seen = true,
            }
        }
        Ok(Self { intervals })
    }

    /// Open a new break interval starting at `now`.
    pub fn open_break(&mut self, now: DateTime<Utc>) -> Result<(), DataError> {
        if self.open_interval().is_some() {
            return Err(DataError::BreakAlreadyOpen);
        }
        self.intervals.push(BreakInterval {
            start: now,
            end: None,
        });
        Ok(())
    }

    /// Close the open break interval as of `now`, returning its duration.
    pub fn close_break(&mut self, now: DateTime<Utc>) -> Result<Duration, DataError> {
        let open = self
            .intervals
            .iter_mut()
            .find(|i| i.is_open())
            .ok_or(DataError::NoOpenBreak)?;
        open.end = Some(now);
        Ok(open.duration_at(now))
    }

    pub fn open_interval(&self) -> Option<&BreakInterval> {
        self.intervals.iter().find(|i| i.is_open())
    }

    /// Sum of `end - start` over closed intervals.
    pub fn closed_total(&self) -> Duration {
        self.intervals
            .iter()
            .filter_map(|i| i.end.map(|end| (end - i.start).max(Duration::zero())))
            .fold(Duration::zero(), |acc, d| acc + d)
    }

    /// `now - start` of the open interval, or zero if none is open.
    pub fn open_duration(&self, now: DateTime<Utc>) -> Duration {
        self.open_interval()
            .map(|i| i.duration_at(now))
            .unwrap_or_else(Duration::zero)
    }

    /// Total break time as of `now`: closed intervals plus the open one.
    pub fn total_at(&self, now: DateTime<Utc>) -> Duration {
        self.closed_total() + self.open_duration(now)
    }

    pub fn intervals(&self) -> &[BreakInterval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn open_then_close_accumulates() {
        let mut ledger = BreakLedger::new();
        ledger.open_break(at(10, 0, 0)).unwrap();
        assert!(ledger.open_interval().is_some());
        assert_eq!(
            ledger.open_duration(at(10, 5, 0)),
            Duration::minutes(5)
        );

        let closed = ledger.close_break(at(10, 15, 0)).unwrap();
        assert_eq!(closed, Duration::minutes(15));
        assert!(ledger.open_interval().is_none());
        assert_eq!(ledger.closed_total(), Duration::minutes(15));
    }

    #[test]
    fn second_open_break_is_rejected() {
        let mut ledger = BreakLedger::new();
        ledger.open_break(at(10, 0, 0)).unwrap();
        assert_eq!(
            ledger.open_break(at(10, 1, 0)),
            Err(DataError::BreakAlreadyOpen)
        );
    }

    #[test]
    fn close_without_open_is_rejected() {
        let mut ledger = BreakLedger::new();
        assert_eq!(
            ledger.close_break(at(10, 0, 0)),
            Err(DataError::NoOpenBreak)
        );
    }

    #[test]
    fn total_includes_open_interval() {
        let mut ledger = BreakLedger::new();
        ledger.open_break(at(10, 0, 0)).unwrap();
        ledger.close_break(at(10, 10, 0)).unwrap();
        ledger.open_break(at(11, 0, 0)).unwrap();

        assert_eq!(ledger.total_at(at(11, 5, 0)), Duration::minutes(15));
    }

    #[test]
    fn from_intervals_accepts_trailing_open() {
        let ledger = BreakLedger::from_intervals(vec![
            BreakInterval {
                start: at(10, 0, 0),
                end: Some(at(10, 10, 0)),
            },
            BreakInterval {
                start: at(11, 0, 0),
                end: None,
            },
        ])
        .unwrap();
        assert_eq!(ledger.intervals().len(), 2);
        assert!(ledger.open_interval().is_some());
    }

    #[test]
    fn from_intervals_rejects_open_in_the_middle() {
        let result = BreakLedger::from_intervals(vec![
            BreakInterval {
                start: at(10, 0, 0),
                end: None,
            },
            BreakInterval {
                start: at(11, 0, 0),
                end: Some(at(11, 10, 0)),
            },
        ]);
        assert_eq!(result, Err(DataError::OpenBreakNotLast));
    }

    #[test]
    fn from_intervals_rejects_two_open() {
        let result = BreakLedger::from_intervals(vec![
            BreakInterval {
                start: at(10, 0, 0),
                end: None,
            },
            BreakInterval {
                start: at(11, 0, 0),
                end: None,
            },
        ]);
        assert_eq!(result, Err(DataError::MultipleOpenBreaks));
    }

    #[test]
    fn from_intervals_rejects_negative_interval() {
        let result = BreakLedger::from_intervals(vec![BreakInterval {
            start: at(10, 0, 0),
            end: Some(at(9, 0, 0)),
        }]);
        assert!(matches!(result, Err(DataError::NegativeInterval { .. })));
    }
}
