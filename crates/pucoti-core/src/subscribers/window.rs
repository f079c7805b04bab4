use std::sync::Arc;

use tracing::warn;

use crate::events::TimerEvent;
use crate::shell::DisplayMode;
use crate::sinks::WindowController;
use crate::storage::ConfigHandle;
use crate::timer::{Subscription, TimerMachine};

/// Told about every layout the coordinator asks for.
pub type ModeListener = Box<dyn Fn(DisplayMode) + Send + Sync>;

/// Shrinks the window into a corner when a real session starts (if
/// `window.on_timer_start = "corner"`) and restores it when the session ends.
///
/// The idle sentinel from `reset()` never triggers compact mode.
pub struct WindowCoordinator {
    controller: Arc<dyn WindowController>,
    config: ConfigHandle,
    on_mode: Option<ModeListener>,
}

impl WindowCoordinator {
    pub fn new(controller: Arc<dyn WindowController>, config: ConfigHandle) -> Self {
        Self {
            controller,
            config,
            on_mode: None,
        }
    }

    pub fn on_mode(mut self, listener: impl Fn(DisplayMode) + Send + Sync + 'static) -> Self {
        self.on_mode = Some(Box::new(listener));
        self
    }

    pub fn attach(self: &Arc<Self>, machine: &TimerMachine) -> Subscription {
        let this = Arc::clone(self);
        machine.subscribe(move |event| this.handle(event))
    }

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::Started { state } => {
                let window = self.config.read(|c| c.window.clone());
                if !window.auto_compact() || !state.has_content() {
                    return;
                }
                self.signal(DisplayMode::Small);
                if let Err(e) = self.controller.set_compact_mode(&window) {
                    warn!(error = %e, "failed to enter compact mode");
                }
            }
            TimerEvent::Completed { .. } | TimerEvent::Canceled { .. } => {
                let window = self.config.read(|c| c.window.clone());
                self.signal(DisplayMode::Normal);
                if let Err(e) = self.controller.set_normal_mode(&window) {
                    warn!(error = %e, "failed to restore normal mode");
                }
            }
            _ => {}
        }
    }

    fn signal(&self, mode: DisplayMode) {
        if let Some(listener) = &self.on_mode {
            listener(mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MemoryWindowController, WindowCall};
    use crate::storage::{Config, WindowStartMode};
    use crate::timer::TimerSession;
    use chrono::Utc;
    use std::sync::Mutex;

    fn session(text: &str, predicted: Option<u64>) -> TimerSession {
        TimerSession {
            focus_text: text.into(),
            predicted_seconds: predicted,
            start_time: Utc::now(),
            adjustment_seconds: 0,
            tags: vec![],
        }
    }

    fn coordinator(
        mode: WindowStartMode,
    ) -> (Arc<MemoryWindowController>, Arc<Mutex<Vec<DisplayMode>>>, WindowCoordinator) {
        let controller = Arc::new(MemoryWindowController::new());
        let mut config = Config::default();
        config.window.on_timer_start = mode;
        let modes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&modes);
        let coord = WindowCoordinator::new(controller.clone(), ConfigHandle::new(config))
            .on_mode(move |m| seen.lock().unwrap().push(m));
        (controller, modes, coord)
    }

    #[test]
    fn start_with_content_goes_compact() {
        let (controller, modes, coord) = coordinator(WindowStartMode::Corner);
        coord.handle(&TimerEvent::Started {
            state: session("write", None),
        });
        coord.handle(&TimerEvent::Started {
            state: session("", Some(600)),
        });
        assert_eq!(controller.calls(), vec![WindowCall::Compact, WindowCall::Compact]);
        assert_eq!(*modes.lock().unwrap(), vec![DisplayMode::Small, DisplayMode::Small]);
    }

    #[test]
    fn idle_sentinel_stays_normal() {
        let (controller, modes, coord) = coordinator(WindowStartMode::Corner);
        coord.handle(&TimerEvent::Started {
            state: session("", None),
        });
        assert!(controller.calls().is_empty());
        assert!(modes.lock().unwrap().is_empty());
    }

    #[test]
    fn auto_transition_off_ignores_start() {
        let (controller, _, coord) = coordinator(WindowStartMode::None);
        coord.handle(&TimerEvent::Started {
            state: session("write", Some(60)),
        });
        assert!(controller.calls().is_empty());
    }

    #[test]
    fn terminal_events_restore_normal_even_on_failure() {
        let (controller, modes, coord) = coordinator(WindowStartMode::None);
        controller.set_failing(true);
        coord.handle(&TimerEvent::Completed {
            state: session("write", Some(60)),
            elapsed: 61,
        });
        coord.handle(&TimerEvent::Canceled {
            state: session("", None),
            elapsed: 3,
        });
        assert_eq!(controller.calls(), vec![WindowCall::Normal, WindowCall::Normal]);
        assert_eq!(*modes.lock().unwrap(), vec![DisplayMode::Normal, DisplayMode::Normal]);
    }
}
