//! Session state machine.
//!
//! Three states, remote-confirmed transitions:
//!
//! ```text
//! Offline -> Working -> OnBreak -> Working -> ... -> Offline
//! ```
//!
//! A transition only mutates local state after the attendance store reports
//! success; on failure the state is left untouched and the error surfaces
//! to the caller. Each transition kind is guarded against concurrent
//! re-issue (a double-clicked button must not fire two commands).

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::accumulator::{self, Metrics, STANDARD_WORK_SECS};
use super::ledger::BreakLedger;
use crate::clock::Clock;
use crate::error::{DataError, EngineError};
use crate::events::Event;
use crate::missed::MissedClockOutResolver;
use crate::store::AttendanceStore;
use crate::ticker::{Snapshot, Ticker};

/// Where the session currently is in its daily cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Offline,
    Working,
    OnBreak,
}

impl SessionStatus {
    /// Display label, as shown next to the running clock.
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Offline => "OFFLINE",
            SessionStatus::Working => "WORKING",
            SessionStatus::OnBreak => "ON BREAK",
        }
    }

    fn permits(self, action: TransitionKind) -> bool {
        match action {
            TransitionKind::ClockIn => self == SessionStatus::Offline,
            TransitionKind::TakeBreak => self == SessionStatus::Working,
            TransitionKind::ResumeWork => self == SessionStatus::OnBreak,
            TransitionKind::ClockOut => {
                matches!(self, SessionStatus::Working | SessionStatus::OnBreak)
            }
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The four remote-confirmed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    ClockIn,
    TakeBreak,
    ResumeWork,
    ClockOut,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransitionKind::ClockIn => "clock in",
            TransitionKind::TakeBreak => "take a break",
            TransitionKind::ResumeWork => "resume work",
            TransitionKind::ClockOut => "clock out",
        };
        f.write_str(name)
    }
}

/// Caller-supplied confirmation step, asked before a command is issued.
///
/// Keeps the human-in-the-loop policy out of the state machine: the engine
/// stays deterministic and a declined confirmation is a quiet no-op.
pub trait ConfirmTransition: Send + Sync {
    fn confirm(&self, action: TransitionKind) -> bool;
}

/// Confirmation policy that never asks. Default for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl ConfirmTransition for AutoConfirm {
    fn confirm(&self, _action: TransitionKind) -> bool {
        true
    }
}

/// Tunable policy knobs, sourced from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EnginePolicy {
    /// Seconds in a standard workday; the overtime threshold.
    pub standard_work_secs: u64,
    /// An open session older than this is a missed clock-out.
    pub missed_clock_out_after: Duration,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            standard_work_secs: STANDARD_WORK_SECS,
            missed_clock_out_after: Duration::hours(
                crate::missed::DEFAULT_MISSED_CLOCK_OUT_AFTER_HOURS,
            ),
        }
    }
}

/// In-memory projection of the current session.
///
/// Rebuildable at any time from the store's canonical record; the store is
/// the sole persistent owner.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) session_start: Option<DateTime<Utc>>,
    pub(crate) clock_out: Option<DateTime<Utc>>,
    pub(crate) ledger: BreakLedger,
    /// Bumped on every applied mutation. A reconciliation fetched against
    /// an older revision is stale and must be discarded.
    pub(crate) revision: u64,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            status: SessionStatus::Offline,
            session_start: None,
            clock_out: None,
            ledger: BreakLedger::new(),
            revision: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn ledger(&self) -> &BreakLedger {
        &self.ledger
    }

    pub fn metrics(&self, now: DateTime<Utc>, standard_work_secs: u64) -> Metrics {
        accumulator::metrics(
            self.session_start,
            self.clock_out,
            &self.ledger,
            now,
            standard_work_secs,
        )
    }

    fn apply_clock_in(&mut self, now: DateTime<Utc>) {
        self.status = SessionStatus::Working;
        self.session_start = Some(now);
        self.clock_out = None;
        self.ledger.clear();
        self.revision += 1;
    }

    fn apply_take_break(&mut self, now: DateTime<Utc>) -> Result<(), DataError> {
        self.ledger.open_break(now)?;
        self.status = SessionStatus::OnBreak;
        self.revision += 1;
        Ok(())
    }

    fn apply_resume_work(&mut self, now: DateTime<Utc>) -> Result<Duration, DataError> {
        let closed = self.ledger.close_break(now)?;
        self.status = SessionStatus::Working;
        self.revision += 1;
        Ok(closed)
    }

    /// Close out the session, returning its final figures.
    fn apply_clock_out(
        &mut self,
        now: DateTime<Utc>,
        standard_work_secs: u64,
    ) -> Result<Metrics, DataError> {
        if self.ledger.open_interval().is_some() {
            self.ledger.close_break(now)?;
        }
        let final_metrics = accumulator::metrics(
            self.session_start,
            Some(now),
            &self.ledger,
            now,
            standard_work_secs,
        );
        self.status = SessionStatus::Offline;
        self.clock_out = Some(now);
        self.session_start = None;
        self.ledger.clear();
        self.revision += 1;
        Ok(final_metrics)
    }

    pub(crate) fn reset_offline(&mut self) {
        self.status = SessionStatus::Offline;
        self.session_start = None;
        self.clock_out = None;
        self.ledger.clear();
        self.revision += 1;
    }
}

/// Clears the per-transition in-flight flag when the transition settles.
struct InFlightGuard {
    flags: Arc<Mutex<HashSet<TransitionKind>>>,
    action: TransitionKind,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flags.lock().unwrap().remove(&self.action);
    }
}

/// The attendance engine: state machine, ledger, ticker and reconciler
/// behind one handle. One instance per session; every view consumes the
/// same snapshot channel.
pub struct SessionEngine<S> {
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: EnginePolicy,
    pub(crate) state: Arc<Mutex<SessionState>>,
    in_flight: Arc<Mutex<HashSet<TransitionKind>>>,
    confirm: Box<dyn ConfirmTransition>,
    pub(crate) ticker: Mutex<Ticker>,
    pub(crate) resolver: Mutex<MissedClockOutResolver>,
    pub(crate) sync_error: Arc<Mutex<Option<String>>>,
}

impl<S: AttendanceStore> SessionEngine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_policy(store, clock, EnginePolicy::default())
    }

    pub fn with_policy(store: S, clock: Arc<dyn Clock>, policy: EnginePolicy) -> Self {
        let state = Arc::new(Mutex::new(SessionState::new()));
        let sync_error = Arc::new(Mutex::new(None));
        let ticker = Ticker::new(
            Arc::clone(&state),
            Arc::clone(&clock),
            policy.standard_work_secs,
            Arc::clone(&sync_error),
        );
        Self {
            store,
            clock,
            policy,
            state,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            confirm: Box::new(AutoConfirm),
            ticker: Mutex::new(ticker),
            resolver: Mutex::new(MissedClockOutResolver::new(policy.missed_clock_out_after)),
            sync_error,
        }
    }

    /// Replace the confirmation hook (e.g. an interactive prompt).
    pub fn with_confirmation(mut self, confirm: Box<dyn ConfirmTransition>) -> Self {
        self.confirm = confirm;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.state.lock().unwrap().status
    }

    /// Compute a display snapshot as of now.
    pub fn snapshot(&self) -> Snapshot {
        self.ticker.lock().unwrap().current()
    }

    /// Subscribe to the once-per-second snapshot stream.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Snapshot> {
        self.ticker.lock().unwrap().subscribe()
    }

    /// Mirror of the hosting view's foreground visibility.
    pub fn set_visible(&self, visible: bool) {
        self.ticker.lock().unwrap().set_visible(visible);
    }

    /// Message of the last failed reconciliation, if it has not succeeded
    /// since.
    pub fn sync_error(&self) -> Option<String> {
        self.sync_error.lock().unwrap().clone()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Offline -> Working. Starts a fresh cycle: clears the break ledger
    /// and zeroes the displayed time.
    pub async fn clock_in(&self) -> Result<Option<Event>, EngineError> {
        let _guard = self.begin(TransitionKind::ClockIn)?;
        if !self.confirm.confirm(TransitionKind::ClockIn) {
            return Ok(None);
        }
        self.store.clock_in().await?;
        let now = self.clock.now();
        self.state.lock().unwrap().apply_clock_in(now);
        info!(at = %now, "clocked in");
        self.sync_ticker();
        self.refresh().await;
        Ok(Some(Event::ClockedIn { at: now }))
    }

    /// Working -> OnBreak. Opens a new break interval at now.
    pub async fn take_break(&self) -> Result<Option<Event>, EngineError> {
        let _guard = self.begin(TransitionKind::TakeBreak)?;
        if !self.confirm.confirm(TransitionKind::TakeBreak) {
            return Ok(None);
        }
        self.store.take_break().await?;
        let now = self.clock.now();
        self.state.lock().unwrap().apply_take_break(now)?;
        info!(at = %now, "break started");
        self.sync_ticker();
        self.refresh().await;
        Ok(Some(Event::BreakStarted { at: now }))
    }

    /// OnBreak -> Working. Closes the open interval, folding its duration
    /// into the break totals.
    pub async fn resume_work(&self) -> Result<Option<Event>, EngineError> {
        let _guard = self.begin(TransitionKind::ResumeWork)?;
        if !self.confirm.confirm(TransitionKind::ResumeWork) {
            return Ok(None);
        }
        self.store.resume_work().await?;
        let now = self.clock.now();
        let closed = self.state.lock().unwrap().apply_resume_work(now)?;
        info!(at = %now, break_secs = closed.num_seconds(), "work resumed");
        self.sync_ticker();
        self.refresh().await;
        Ok(Some(Event::BreakEnded {
            at: now,
            break_secs: closed.num_seconds().max(0) as u64,
        }))
    }

    /// Working or OnBreak -> Offline. An open break is closed as of now
    /// before the final figures are computed.
    pub async fn clock_out(&self) -> Result<Option<Event>, EngineError> {
        let _guard = self.begin(TransitionKind::ClockOut)?;
        if !self.confirm.confirm(TransitionKind::ClockOut) {
            return Ok(None);
        }
        self.store.clock_out().await?;
        let now = self.clock.now();
        let final_metrics = self
            .state
            .lock()
            .unwrap()
            .apply_clock_out(now, self.policy.standard_work_secs)?;
        info!(
            at = %now,
            worked = %final_metrics.worked_hms(),
            "clocked out"
        );
        self.sync_ticker();
        self.refresh().await;
        Ok(Some(Event::ClockedOut {
            at: now,
            worked_secs: final_metrics.worked_secs,
            break_secs: final_metrics.break_secs,
            overtime_secs: final_metrics.overtime_secs,
        }))
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Precondition and re-entrancy gate. The returned guard clears the
    /// in-flight flag once the transition settles, success or not.
    fn begin(&self, action: TransitionKind) -> Result<InFlightGuard, EngineError> {
        let status = self.state.lock().unwrap().status;
        if !status.permits(action) {
            return Err(EngineError::InvalidTransition { status, action });
        }
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(action) {
            return Err(EngineError::InFlight(action));
        }
        drop(in_flight);
        Ok(InFlightGuard {
            flags: Arc::clone(&self.in_flight),
            action,
        })
    }

    /// Restart or stop the ticker to match the new status and push a fresh
    /// snapshot so displays never show a stale second.
    pub(crate) fn sync_ticker(&self) {
        let status = self.state.lock().unwrap().status;
        let mut ticker = self.ticker.lock().unwrap();
        ticker.stop();
        if status != SessionStatus::Offline {
            ticker.start();
        }
        ticker.publish_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::store::{AttendanceRecord, InMemoryStore, ManualClockOut};
    use chrono::TimeZone;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn engine() -> (Arc<ManualClock>, Arc<InMemoryStore>, SessionEngine<Arc<InMemoryStore>>) {
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let engine = SessionEngine::new(store.clone(), clock.clone());
        (clock, store, engine)
    }

    #[tokio::test]
    async fn clock_in_starts_working() {
        let (_clock, _store, engine) = engine();
        let event = engine.clock_in().await.unwrap();
        assert!(matches!(event, Some(Event::ClockedIn { .. })));
        assert_eq!(engine.status(), SessionStatus::Working);
    }

    #[tokio::test]
    async fn clock_in_twice_is_invalid() {
        let (_clock, _store, engine) = engine();
        engine.clock_in().await.unwrap();
        let err = engine.clock_in().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                status: SessionStatus::Working,
                action: TransitionKind::ClockIn,
            }
        ));
    }

    #[tokio::test]
    async fn resume_without_break_is_invalid_and_changes_nothing() {
        let (clock, _store, engine) = engine();
        engine.clock_in().await.unwrap();
        clock.advance(Duration::minutes(10));

        let err = engine.resume_work().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                action: TransitionKind::ResumeWork,
                ..
            }
        ));
        let state = engine.state.lock().unwrap();
        assert!(state.ledger.is_empty());
        assert_eq!(state.status, SessionStatus::Working);
    }

    #[tokio::test]
    async fn failed_command_leaves_state_untouched() {
        let (clock, store, engine) = engine();
        engine.clock_in().await.unwrap();
        clock.advance(Duration::minutes(5));

        store.fail_next(StoreError::Rejected("server said no".into()));
        let err = engine.take_break().await.unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));

        let state = engine.state.lock().unwrap();
        assert_eq!(state.status, SessionStatus::Working);
        assert!(state.ledger.is_empty());
    }

    #[tokio::test]
    async fn declined_confirmation_issues_no_command() {
        struct Decline;
        impl ConfirmTransition for Decline {
            fn confirm(&self, _action: TransitionKind) -> bool {
                false
            }
        }

        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let engine =
            SessionEngine::new(store.clone(), clock).with_confirmation(Box::new(Decline));

        let event = engine.clock_in().await.unwrap();
        assert!(event.is_none());
        assert_eq!(engine.status(), SessionStatus::Offline);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn break_cycle_accumulates_ledger() {
        let (clock, _store, engine) = engine();
        engine.clock_in().await.unwrap();
        clock.advance(Duration::hours(1));
        engine.take_break().await.unwrap();
        assert_eq!(engine.status(), SessionStatus::OnBreak);

        clock.advance(Duration::minutes(15));
        let event = engine.resume_work().await.unwrap();
        match event {
            Some(Event::BreakEnded { break_secs, .. }) => assert_eq!(break_secs, 15 * 60),
            other => panic!("expected BreakEnded, got {other:?}"),
        }
        assert_eq!(engine.status(), SessionStatus::Working);
    }

    #[tokio::test]
    async fn clock_out_from_break_closes_the_interval() {
        let (clock, store, engine) = engine();
        engine.clock_in().await.unwrap();
        clock.advance(Duration::hours(2));
        engine.take_break().await.unwrap();
        clock.advance(Duration::minutes(30));

        let event = engine.clock_out().await.unwrap();
        match event {
            Some(Event::ClockedOut {
                worked_secs,
                break_secs,
                ..
            }) => {
                assert_eq!(worked_secs, 2 * 3600);
                assert_eq!(break_secs, 30 * 60);
            }
            other => panic!("expected ClockedOut, got {other:?}"),
        }
        assert_eq!(engine.status(), SessionStatus::Offline);

        let record = store.fetch_attendance().await.unwrap().unwrap();
        assert!(record.breaks[0].end.is_some());
    }

    /// Store that parks its clock-in command until virtual time advances,
    /// so a second caller can race it.
    struct GatedStore {
        inner: InMemoryStore,
    }

    impl AttendanceStore for GatedStore {
        async fn clock_in(&self) -> Result<(), StoreError> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.inner.clock_in().await
        }
        async fn clock_out(&self) -> Result<(), StoreError> {
            self.inner.clock_out().await
        }
        async fn take_break(&self) -> Result<(), StoreError> {
            self.inner.take_break().await
        }
        async fn resume_work(&self) -> Result<(), StoreError> {
            self.inner.resume_work().await
        }
        async fn fetch_attendance(&self) -> Result<Option<AttendanceRecord>, StoreError> {
            self.inner.fetch_attendance().await
        }
        async fn manual_clock_out(&self, correction: &ManualClockOut) -> Result<(), StoreError> {
            self.inner.manual_clock_out(correction).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_clock_in_is_guarded() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = GatedStore {
            inner: InMemoryStore::new(clock.clone()),
        };
        let engine = Arc::new(SessionEngine::new(store, clock));

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.clock_in().await })
        };
        // Let the first transition reach its in-flight await.
        tokio::task::yield_now().await;

        let err = engine.clock_in().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InFlight(TransitionKind::ClockIn)
        ));

        first.await.unwrap().unwrap();
        assert_eq!(engine.status(), SessionStatus::Working);
    }

    #[tokio::test]
    async fn confirmation_hook_sees_each_action() {
        struct Recorder(Arc<Mutex<Vec<TransitionKind>>>);
        impl ConfirmTransition for Recorder {
            fn confirm(&self, action: TransitionKind) -> bool {
                self.0.lock().unwrap().push(action);
                true
            }
        }

        let asked = Arc::new(Mutex::new(Vec::new()));
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let engine = SessionEngine::new(store, clock.clone())
            .with_confirmation(Box::new(Recorder(Arc::clone(&asked))));

        engine.clock_in().await.unwrap();
        clock.advance(Duration::hours(1));
        engine.clock_out().await.unwrap();

        assert_eq!(
            *asked.lock().unwrap(),
            vec![TransitionKind::ClockIn, TransitionKind::ClockOut]
        );
    }
}
