use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::events::TimerEvent;
use crate::format::format_duration;
use crate::sinks::NotificationSink;
use crate::storage::ConfigHandle;
use crate::timer::{Subscription, TimerMachine};

pub const OVERTIME_TITLE: &str = "Time's up!";

/// Notification body for a session that just ran out.
pub fn overtime_message(focus_text: &str, elapsed: i64) -> String {
    let duration = format_duration(elapsed.max(0) as u64);
    if focus_text.is_empty() {
        format!("Timer finished after {duration}")
    } else {
        format!("You focused on {focus_text} for {duration}")
    }
}

/// Rings the bell and notifies when a session runs into overtime, then
/// keeps ringing every `notifications.bell_repeat_interval_secs` until the
/// session leaves overtime or ends.
///
/// Repeats are driven by ticks, so the interval is read fresh each time.
pub struct BellCoordinator {
    notifier: Arc<dyn NotificationSink>,
    config: ConfigHandle,
    /// Elapsed seconds at the last ring; `Some` only while repeating.
    last_ring: Mutex<Option<i64>>,
}

impl BellCoordinator {
    pub fn new(notifier: Arc<dyn NotificationSink>, config: ConfigHandle) -> Self {
        Self {
            notifier,
            config,
            last_ring: Mutex::new(None),
        }
    }

    pub fn attach(self: &Arc<Self>, machine: &TimerMachine) -> Subscription {
        let this = Arc::clone(self);
        machine.subscribe(move |event| this.handle(event))
    }

    pub fn is_repeating(&self) -> bool {
        self.last_ring().is_some()
    }

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::OvertimeEntered {
                focus_text,
                elapsed,
            } => {
                let notifications = self.config.read(|c| c.notifications.clone());
                *self.last_ring_mut() = Some(*elapsed);
                self.ring(notifications.custom_bell_path.as_deref());

                let body = overtime_message(focus_text, *elapsed);
                if let Err(e) = self.notifier.show_notification(
                    OVERTIME_TITLE,
                    &body,
                    notifications.notification_command.as_deref(),
                ) {
                    warn!(error = %e, focus_text = %focus_text, "notification failed");
                }
            }
            TimerEvent::Tick {
                elapsed,
                is_overtime: true,
                ..
            } => {
                let (interval, custom_path) = self.config.read(|c| {
                    (
                        c.notifications.bell_repeat_interval_secs,
                        c.notifications.custom_bell_path.clone(),
                    )
                });
                let due = {
                    let mut last = self.last_ring_mut();
                    match *last {
                        Some(at) if interval > 0 && elapsed - at >= interval as i64 => {
                            *last = Some(*elapsed);
                            true
                        }
                        _ => false,
                    }
                };
                if due {
                    self.ring(custom_path.as_deref());
                }
            }
            TimerEvent::Started { .. }
            | TimerEvent::OvertimeExited
            | TimerEvent::Completed { .. }
            | TimerEvent::Canceled { .. } => {
                *self.last_ring_mut() = None;
            }
            TimerEvent::Tick { .. } | TimerEvent::Adjusted { .. } => {}
        }
    }

    fn ring(&self, custom_path: Option<&str>) {
        if let Err(e) = self.notifier.play_bell(custom_path) {
            warn!(error = %e, "bell failed");
        }
    }

    fn last_ring(&self) -> Option<i64> {
        *self.last_ring.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn last_ring_mut(&self) -> std::sync::MutexGuard<'_, Option<i64>> {
        self.last_ring.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MemoryNotifier, NotifierCall};
    use crate::storage::Config;
    use crate::timer::TimerSession;
    use chrono::Utc;

    fn coordinator(interval: u64) -> (Arc<MemoryNotifier>, ConfigHandle, BellCoordinator) {
        let notifier = Arc::new(MemoryNotifier::new());
        let mut config = Config::default();
        config.notifications.bell_repeat_interval_secs = interval;
        let config = ConfigHandle::new(config);
        let bell = BellCoordinator::new(notifier.clone(), config.clone());
        (notifier, config, bell)
    }

    fn tick(elapsed: i64, overtime: bool) -> TimerEvent {
        TimerEvent::Tick {
            elapsed,
            remaining: if overtime { -1 } else { 1 },
            is_overtime: overtime,
        }
    }

    fn entered(text: &str, elapsed: i64) -> TimerEvent {
        TimerEvent::OvertimeEntered {
            focus_text: text.into(),
            elapsed,
        }
    }

    fn session() -> TimerSession {
        TimerSession {
            focus_text: "x".into(),
            predicted_seconds: Some(60),
            start_time: Utc::now(),
            adjustment_seconds: 0,
            tags: vec![],
        }
    }

    #[test]
    fn messages() {
        assert_eq!(
            overtime_message("write docs", 1500),
            "You focused on write docs for 25m"
        );
        assert_eq!(overtime_message("", 300), "Timer finished after 5m");
    }

    #[test]
    fn entry_rings_and_notifies_once() {
        let (notifier, _, bell) = coordinator(20);
        bell.handle(&tick(61, true));
        assert!(notifier.calls().is_empty());

        bell.handle(&entered("write docs", 61));
        assert_eq!(
            notifier.calls(),
            vec![
                NotifierCall::Bell { custom_path: None },
                NotifierCall::Notification {
                    title: "Time's up!".into(),
                    body: "You focused on write docs for 1m 1s".into(),
                    custom_command: None,
                },
            ]
        );
        assert!(bell.is_repeating());
    }

    #[test]
    fn repeats_every_interval_until_exit() {
        let (notifier, _, bell) = coordinator(20);
        bell.handle(&entered("x", 100));
        for elapsed in 101..=141 {
            bell.handle(&tick(elapsed, true));
        }
        assert_eq!(notifier.bell_count(), 3);

        bell.handle(&TimerEvent::OvertimeExited);
        assert!(!bell.is_repeating());
        for elapsed in 142..=200 {
            bell.handle(&tick(elapsed, true));
        }
        assert_eq!(notifier.bell_count(), 3);
    }

    #[test]
    fn zero_interval_rings_once() {
        let (notifier, _, bell) = coordinator(0);
        bell.handle(&entered("x", 10));
        for elapsed in 11..100 {
            bell.handle(&tick(elapsed, true));
        }
        assert_eq!(notifier.bell_count(), 1);
    }

    #[test]
    fn interval_change_applies_to_the_running_repeat() {
        let (notifier, config, bell) = coordinator(60);
        bell.handle(&entered("x", 0));
        bell.handle(&tick(10, true));
        assert_eq!(notifier.bell_count(), 1);

        config.update(|c| c.notifications.bell_repeat_interval_secs = 5);
        bell.handle(&tick(10, true));
        assert_eq!(notifier.bell_count(), 2);

        config.update(|c| c.notifications.custom_bell_path = Some("/tmp/gong.wav".into()));
        bell.handle(&tick(15, true));
        assert_eq!(
            notifier.calls().last(),
            Some(&NotifierCall::Bell {
                custom_path: Some("/tmp/gong.wav".into())
            })
        );
    }

    #[test]
    fn terminal_events_stop_repeating() {
        for end in [
            TimerEvent::Completed {
                state: session(),
                elapsed: 90,
            },
            TimerEvent::Canceled {
                state: session(),
                elapsed: 90,
            },
        ] {
            let (notifier, _, bell) = coordinator(1);
            bell.handle(&entered("x", 80));
            bell.handle(&end);
            bell.handle(&tick(95, true));
            assert_eq!(notifier.bell_count(), 1);
        }
    }

    #[test]
    fn sink_failures_are_swallowed() {
        let (notifier, _, bell) = coordinator(1);
        notifier.set_failing(true);
        bell.handle(&entered("x", 5));
        bell.handle(&tick(6, true));
        assert_eq!(notifier.bell_count(), 2);
    }
}
