//! The attendance session: break ledger, time accumulation and the
//! Offline/Working/OnBreak state machine.

pub mod accumulator;
pub mod ledger;
pub mod machine;

pub use accumulator::{format_hms, Metrics, STANDARD_WORK_SECS};
pub use ledger::{BreakInterval, BreakLedger};
pub use machine::{
    AutoConfirm, ConfirmTransition, EnginePolicy, SessionEngine, SessionState, SessionStatus,
    TransitionKind,
};
