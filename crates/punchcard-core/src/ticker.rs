//! Once-per-second recomputation loop driving display refresh.
//!
//! The ticker never increments a counter. Every published snapshot is
//! recomputed from absolute timestamps, so a display that was suspended for
//! any length of time shows the correct value the instant it resumes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::clock::Clock;
use crate::session::machine::SessionState;
use crate::session::{Metrics, SessionStatus};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One display-ready view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub status: SessionStatus,
    pub metrics: Metrics,
    /// The last reconciliation failed; figures fall back to zero/Offline
    /// until the store can be reached again.
    pub sync_error: bool,
    pub at: DateTime<Utc>,
}

impl Snapshot {
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

/// Cancellable scheduled task recomputing [`Snapshot`]s at 1 Hz.
///
/// Publishing is suspended while the hosting view reports itself hidden;
/// regaining visibility publishes an immediately recomputed snapshot.
pub struct Ticker {
    state: Arc<Mutex<SessionState>>,
    clock: Arc<dyn Clock>,
    standard_work_secs: u64,
    sync_error: Arc<Mutex<Option<String>>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    visible_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub(crate) fn new(
        state: Arc<Mutex<SessionState>>,
        clock: Arc<dyn Clock>,
        standard_work_secs: u64,
        sync_error: Arc<Mutex<Option<String>>>,
    ) -> Self {
        let initial = compute_snapshot(&state, clock.as_ref(), standard_work_secs, &sync_error);
        let (snapshot_tx, _) = watch::channel(initial);
        let (visible_tx, _) = watch::channel(true);
        Self {
            state,
            clock,
            standard_work_secs,
            sync_error,
            snapshot_tx: Arc::new(snapshot_tx),
            visible_tx,
            handle: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot, recomputed as of now.
    pub fn current(&self) -> Snapshot {
        compute_snapshot(
            &self.state,
            self.clock.as_ref(),
            self.standard_work_secs,
            &self.sync_error,
        )
    }

    /// Spawn the recompute loop. No-op if it is already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        debug!("ticker started");
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let sync_error = Arc::clone(&self.sync_error);
        let tx = Arc::clone(&self.snapshot_tx);
        let mut visible = self.visible_tx.subscribe();
        let standard_work_secs = self.standard_work_secs;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *visible.borrow() {
                            tx.send_replace(compute_snapshot(
                                &state,
                                clock.as_ref(),
                                standard_work_secs,
                                &sync_error,
                            ));
                        }
                    }
                    changed = visible.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // Foreground regained: recompute from absolute
                        // timestamps instead of resuming a counter.
                        if *visible.borrow() {
                            tx.send_replace(compute_snapshot(
                                &state,
                                clock.as_ref(),
                                standard_work_secs,
                                &sync_error,
                            ));
                        }
                    }
                }
            }
        }));
    }

    /// Cancel the loop and clear its handle. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("ticker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Mirror of the hosting view's foreground visibility.
    pub fn set_visible(&self, visible: bool) {
        self.visible_tx.send_replace(visible);
    }

    /// Recompute and publish immediately, outside the tick schedule.
    pub fn publish_now(&self) {
        self.snapshot_tx.send_replace(self.current());
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn compute_snapshot(
    state: &Mutex<SessionState>,
    clock: &dyn Clock,
    standard_work_secs: u64,
    sync_error: &Mutex<Option<String>>,
) -> Snapshot {
    let now = clock.now();
    let state = state.lock().unwrap();
    Snapshot {
        status: state.status(),
        metrics: state.metrics(now, standard_work_secs),
        sync_error: sync_error.lock().unwrap().is_some(),
        at: now,
    }
}
