//! Error types for punchcard-core.
//!
//! One enum per layer: [`EngineError`] for state-machine transitions,
//! [`StoreError`] for the remote attendance store, [`DataError`] for
//! attendance data that violates its own invariants, and [`ConfigError`]
//! for configuration loading.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::session::{SessionStatus, TransitionKind};

/// Errors surfaced by the session state machine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A transition was attempted from a state that does not permit it.
    #[error("cannot {action} while {status}")]
    InvalidTransition {
        status: SessionStatus,
        action: TransitionKind,
    },

    /// The same transition is already awaiting the store's answer.
    #[error("a {0} command is already in flight")]
    InFlight(TransitionKind),

    /// A remote command or fetch failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Attendance data broke one of its invariants.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Errors from the remote attendance store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status.
    #[error("attendance API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure or timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured base URL is not a valid URL.
    #[error("invalid attendance API base URL: {0}")]
    BaseUrl(String),

    /// The store rejected a command for a domain reason.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The store's answer could not be interpreted.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Violations of the attendance data model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    /// The fetched record could not be decoded.
    #[error("malformed attendance record: {0}")]
    Decode(String),

    /// A break interval ends before it starts.
    #[error("break interval ends at {end} before it starts at {start}")]
    NegativeInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// More than one break interval is open at once.
    #[error("more than one open break interval")]
    MultipleOpenBreaks,

    /// An open break interval is followed by later breaks.
    #[error("open break interval is not the most recent break")]
    OpenBreakNotLast,

    /// `openBreak` was applied while a break was already open.
    #[error("a break is already open")]
    BreakAlreadyOpen,

    /// `closeBreak` was applied with no open break.
    #[error("no break is open")]
    NoOpenBreak,
}

/// Configuration loading and saving errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),
}
