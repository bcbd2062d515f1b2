//! # Punchcard Core Library
//!
//! Headless engine for attendance time tracking: when an employee is
//! clocked in, on break, or clocked out, and how much productive, break and
//! overtime time has accumulated -- derived from absolute timestamps and
//! kept consistent with the remote attendance store.
//!
//! ## Architecture
//!
//! - **Session state machine**: Offline -> Working -> OnBreak -> ... ->
//!   Offline, every transition confirmed by the store before local state
//!   moves
//! - **Break ledger + accumulator**: pure time math over timestamp
//!   intervals; nothing counts up, everything is recomputed on demand
//! - **Ticker**: a cancellable 1 Hz recompute loop feeding every view from
//!   one snapshot channel
//! - **Reconciler**: rebuilds local state from the store's canonical
//!   record, discarding any local guess
//! - **Missed clock-out resolver**: flags sessions left open too long and
//!   drives the manual-correction flow
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: the engine behind one handle
//! - [`AttendanceStore`]: the remote store every transition is gated on
//! - [`Ticker`] / [`Snapshot`]: display refresh
//! - [`Config`]: application configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod missed;
pub mod session;
pub mod store;
pub mod ticker;

mod reconcile;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, DataError, EngineError, StoreError};
pub use events::Event;
pub use missed::{MissedClockOut, MissedClockOutResolver};
pub use session::{
    format_hms, AutoConfirm, ConfirmTransition, EnginePolicy, Metrics, SessionEngine,
    SessionStatus, TransitionKind,
};
pub use store::{
    AttendanceRecord, AttendanceStore, HttpAttendanceStore, InMemoryStore, ManualClockOut,
};
pub use ticker::{Snapshot, Ticker};
