//! Engine events.
//!
//! Every applied transition and every reconciliation produces an [`Event`].
//! The CLI prints them as JSON; views refresh from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ClockedIn {
        at: DateTime<Utc>,
    },
    BreakStarted {
        at: DateTime<Utc>,
    },
    BreakEnded {
        at: DateTime<Utc>,
        break_secs: u64,
    },
    /// Session completed; carries the final figures for the day.
    ClockedOut {
        at: DateTime<Utc>,
        worked_secs: u64,
        break_secs: u64,
        overtime_secs: u64,
    },
    /// Local state was rebuilt from the store's canonical record.
    Reconciled {
        status: SessionStatus,
        at: DateTime<Utc>,
    },
}
