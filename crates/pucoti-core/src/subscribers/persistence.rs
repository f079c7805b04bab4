use std::sync::Arc;

use tracing::{debug, warn};

use crate::events::TimerEvent;
use crate::storage::{ActiveSession, ActiveSessionStore, SessionLog, SessionRecord, SessionStatus};
use crate::timer::{Subscription, TimerMachine, TimerSession};

/// Appends finished sessions to the session log.
///
/// - `completed` is always recorded.
/// - `canceled` is recorded only when the session had focus text.
/// - [`on_close`](Self::on_close) records a still-running session as `unknown`.
///
/// With an [`ActiveSessionStore`] it also keeps a marker for the running
/// session so a crash can be recovered on next launch.
pub struct PersistenceCoordinator {
    log: Arc<dyn SessionLog>,
    active: Option<Arc<dyn ActiveSessionStore>>,
}

impl PersistenceCoordinator {
    pub fn new(log: Arc<dyn SessionLog>) -> Self {
        Self { log, active: None }
    }

    pub fn with_active_store(mut self, store: Arc<dyn ActiveSessionStore>) -> Self {
        self.active = Some(store);
        self
    }

    pub fn attach(self: &Arc<Self>, machine: &TimerMachine) -> Subscription {
        let this = Arc::clone(self);
        machine.subscribe(move |event| this.handle(event))
    }

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::Started { state } => self.mark_active(state),
            TimerEvent::Completed { state, elapsed } => {
                self.record(state, *elapsed, SessionStatus::Completed);
                self.clear_active();
            }
            TimerEvent::Canceled { state, elapsed } => {
                if !state.focus_text.is_empty() {
                    self.record(state, *elapsed, SessionStatus::Canceled);
                }
                self.clear_active();
            }
            _ => {}
        }
    }

    /// The application is shutting down: save the running session, if it
    /// has focus text, with status `unknown` and its live elapsed time.
    pub fn on_close(&self, machine: &TimerMachine) {
        let Some(state) = machine.state() else {
            return;
        };
        if state.focus_text.is_empty() {
            return;
        }
        let elapsed = state.elapsed_at(machine.now());
        self.record(&state, elapsed, SessionStatus::Unknown);
        self.clear_active();
    }

    fn record(&self, state: &TimerSession, elapsed: i64, status: SessionStatus) {
        let record = SessionRecord::from_session(state, elapsed, status);
        match self.log.append(&record) {
            Ok(()) => debug!(status = %status, focus_text = %record.focus_text, "session recorded"),
            Err(e) => warn!(
                error = %e,
                status = %status,
                focus_text = %record.focus_text,
                "failed to save session"
            ),
        }
    }

    fn mark_active(&self, state: &TimerSession) {
        let Some(store) = &self.active else {
            return;
        };
        let result = if state.focus_text.is_empty() {
            store.clear_active()
        } else {
            store.save_active(&ActiveSession::from(state))
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to update active session marker");
        }
    }

    fn clear_active(&self) {
        if let Some(store) = &self.active {
            if let Err(e) = store.clear_active() {
                warn!(error = %e, "failed to clear active session marker");
            }
        }
    }
}
