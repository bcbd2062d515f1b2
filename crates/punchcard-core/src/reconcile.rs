//! Reconciliation against the store's canonical attendance record.
//!
//! The fetched record always wins: local state is discarded and rebuilt,
//! never merged. A fetch that completes after the local state has already
//! moved on (a transition applied meanwhile) is stale and is thrown away
//! instead of clobbering the newer state.

use tracing::{debug, info, warn};

use crate::error::{EngineError, StoreError};
use crate::events::Event;
use crate::session::machine::{SessionEngine, SessionState};
use crate::session::{BreakLedger, SessionStatus};
use crate::store::{AttendanceRecord, AttendanceStore};

impl SessionState {
    /// Rebuild this projection verbatim from the canonical record.
    ///
    /// `None` means no session exists for the day; the projection resets to
    /// a neutral Offline.
    pub(crate) fn rebuild(&mut self, record: Option<&AttendanceRecord>) -> Result<(), EngineError> {
        let Some(record) = record else {
            self.reset_offline();
            return Ok(());
        };
        let ledger = BreakLedger::from_intervals(record.breaks.clone())?;
        self.status = if ledger.open_interval().is_some() {
            SessionStatus::OnBreak
        } else if record.clock_out.is_none() {
            SessionStatus::Working
        } else {
            SessionStatus::Offline
        };
        self.session_start = Some(record.clock_in);
        self.clock_out = record.clock_out;
        self.ledger = ledger;
        self.revision += 1;
        Ok(())
    }
}

impl<S: AttendanceStore> SessionEngine<S> {
    /// Fetch the canonical record and rebuild local state from it.
    ///
    /// Returns `Ok(None)` when the fetched snapshot lost the race against a
    /// newer local mutation and was discarded. On fetch failure the display
    /// falls back to a zeroed Offline state and the sync-error flag is set
    /// until the next successful reconciliation.
    pub async fn reconcile(&self) -> Result<Option<Event>, EngineError> {
        let seen = self.state.lock().unwrap().revision;
        let fetched = self.store.fetch_attendance().await;
        let now = self.clock.now();

        let record = match fetched {
            Ok(record) => record,
            Err(error) => {
                let mut state = self.state.lock().unwrap();
                if state.revision == seen {
                    state.reset_offline();
                }
                drop(state);
                warn!(error = %error, "reconciliation failed, falling back to offline display");
                *self.sync_error.lock().unwrap() = Some(error.to_string());
                self.sync_ticker();
                return Err(self.classify(error));
            }
        };

        let status = {
            let mut state = self.state.lock().unwrap();
            if state.revision != seen {
                debug!(
                    seen,
                    current = state.revision,
                    "discarding stale reconciliation result"
                );
                return Ok(None);
            }
            if let Err(error) = state.rebuild(record.as_ref()) {
                state.reset_offline();
                drop(state);
                warn!(error = %error, "malformed attendance record, falling back to offline display");
                *self.sync_error.lock().unwrap() = Some(error.to_string());
                self.sync_ticker();
                return Err(error);
            }
            state.status()
        };
        *self.sync_error.lock().unwrap() = None;

        self.resolver.lock().unwrap().observe(record.as_ref(), now);
        self.sync_ticker();
        info!(%status, "reconciled from attendance store");
        Ok(Some(Event::Reconciled { status, at: now }))
    }

    /// Post-transition reconciliation: keep the projection consistent with
    /// the store, but a fetch hiccup must not fail an already-confirmed
    /// transition.
    pub(crate) async fn refresh(&self) {
        if let Err(error) = self.reconcile().await {
            warn!(error = %error, "post-transition reconciliation failed");
        }
    }

    /// Surface malformed-record failures as data errors rather than
    /// transport errors.
    fn classify(&self, error: StoreError) -> EngineError {
        match error {
            StoreError::Data(data) => EngineError::Data(data),
            other => EngineError::Store(other),
        }
    }
}
