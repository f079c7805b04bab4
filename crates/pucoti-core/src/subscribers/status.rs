use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::events::TimerEvent;
use crate::sinks::{StatusSink, TimerStatus};
use crate::storage::ConfigHandle;
use crate::timer::{Subscription, TimerMachine};

#[derive(Default)]
struct PublisherState {
    /// Focus text of the current session, from `started`/`adjusted`.
    focus_text: String,
    last_published: Option<TimerStatus>,
}

/// Mirrors the running timer to an external [`StatusSink`].
///
/// Ticks publish only while `status.enabled` is set and only when the
/// `(remaining, focus_text, is_overtime)` tuple differs from the last
/// publish. A finished session publishes the stopped state once and clears
/// the cache.
pub struct StatusPublisher {
    sink: Arc<dyn StatusSink>,
    config: ConfigHandle,
    state: Mutex<PublisherState>,
}

impl StatusPublisher {
    pub fn new(sink: Arc<dyn StatusSink>, config: ConfigHandle) -> Self {
        Self {
            sink,
            config,
            state: Mutex::new(PublisherState::default()),
        }
    }

    pub fn attach(self: &Arc<Self>, machine: &TimerMachine) -> Subscription {
        let this = Arc::clone(self);
        machine.subscribe(move |event| this.handle(event))
    }

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::Started { state } | TimerEvent::Adjusted { state, .. } => {
                self.state().focus_text = state.focus_text.clone();
            }
            TimerEvent::Tick {
                remaining,
                is_overtime,
                ..
            } => {
                if !self.config.read(|c| c.status.enabled) {
                    return;
                }
                let status = {
                    let mut st = self.state();
                    let status = TimerStatus::running(*remaining, st.focus_text.clone(), *is_overtime);
                    if st.last_published.as_ref() == Some(&status) {
                        return;
                    }
                    st.last_published = Some(status.clone());
                    status
                };
                self.publish(&status);
            }
            TimerEvent::Completed { .. } | TimerEvent::Canceled { .. } => {
                {
                    let mut st = self.state();
                    st.last_published = None;
                    st.focus_text.clear();
                }
                self.publish(&TimerStatus::stopped());
            }
            TimerEvent::OvertimeEntered { .. } | TimerEvent::OvertimeExited => {}
        }
    }

    /// Host is shutting down: leave the sink showing a stopped timer.
    pub fn on_close(&self) {
        {
            let mut st = self.state();
            st.last_published = None;
            st.focus_text.clear();
        }
        self.publish(&TimerStatus::stopped());
    }

    fn publish(&self, status: &TimerStatus) {
        if let Err(e) = self.sink.publish(status) {
            debug!(error = %e, "status publish failed");
        }
    }

    fn state(&self) -> MutexGuard<'_, PublisherState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
