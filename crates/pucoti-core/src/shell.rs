//! Application shell: screen and display-mode state driven by timer events.
//!
//! The shell is itself just another subscriber. After a `completed` or
//! `canceled` event it calls `reset()`, so an idle countdown is always
//! running once the first session has been started.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::TimerEvent;
use crate::parse::parse_command;
use crate::storage::ConfigHandle;
use crate::timer::{SessionSnapshot, Subscription, TimerMachine, DEFAULT_COUNTDOWN_SECONDS};

pub const TAG_PREDICT: &str = "mode:predict";
pub const TAG_TIMEBOX: &str = "mode:timebox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    NewFocus,
    Timer,
    Completion,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Normal,
    Small,
    Zen,
}

/// The last finished session, as shown on the completion screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub snapshot: SessionSnapshot,
    /// `None` for timebox sessions.
    pub error_percent: Option<f64>,
    pub remark: Option<&'static str>,
}

impl Completion {
    pub fn new(snapshot: SessionSnapshot, rng: &mut impl Rng) -> Self {
        let error_percent = error_percent(&snapshot);
        let remark = error_percent.map(|p| completion_remark(p, rng));
        Self {
            snapshot,
            error_percent,
            remark,
        }
    }
}

/// Signed estimation error: positive took longer than predicted.
pub fn error_percent(snapshot: &SessionSnapshot) -> Option<f64> {
    let state = &snapshot.state;
    if state.tags.iter().any(|t| t == TAG_TIMEBOX) {
        return None;
    }
    let predicted = state.predicted_seconds.filter(|&p| p > 0)? as f64;
    Some((snapshot.elapsed as f64 - predicted) / predicted * 100.0)
}

/// A short reaction to how close the prediction was.
pub fn completion_remark(error_percent: f64, rng: &mut impl Rng) -> &'static str {
    let abs = error_percent.abs();
    let pool: &[&'static str] = if abs <= 5.0 {
        &["Perfect!", "Nailed it!", "Spot on!", "Impressive!"]
    } else if abs <= 10.0 {
        &["Nice!", "Well done!", "Good estimate!", "Pretty close!"]
    } else if error_percent < 0.0 {
        if abs <= 25.0 {
            &["Faster than expected!", "Speed boost!", "Quick work!"]
        } else {
            &["Speed demon!", "That was quick!", "Lightning fast!"]
        }
    } else if abs <= 25.0 {
        &["Not bad", "Close enough", "Getting there"]
    } else if abs <= 50.0 {
        &["Room for improvement", "Keep calibrating", "Getting better"]
    } else {
        &[
            "Did you leave the timer running?",
            "Quite a bit longer",
            "Way off this time",
        ]
    };
    pool.choose(rng).copied().unwrap_or("Done")
}

pub fn format_error_percent(error_percent: f64) -> String {
    let abs = error_percent.abs().round();
    if abs == 0.0 {
        "exactly on time".to_string()
    } else if error_percent > 0.0 {
        format!("{abs:.0}% longer than predicted")
    } else {
        format!("{abs:.0}% less time than predicted")
    }
}

#[derive(Debug)]
struct ShellState {
    screen: Screen,
    display_mode: DisplayMode,
    last_completion: Option<Completion>,
}

/// Screen navigation and session entry on top of one [`TimerMachine`].
pub struct Shell {
    machine: TimerMachine,
    config: ConfigHandle,
    state: Mutex<ShellState>,
}

impl Shell {
    pub fn new(machine: TimerMachine, config: ConfigHandle) -> Arc<Self> {
        Arc::new(Self {
            machine,
            config,
            state: Mutex::new(ShellState {
                screen: Screen::NewFocus,
                display_mode: DisplayMode::Normal,
                last_completion: None,
            }),
        })
    }

    /// Subscribe to the machine. The listener holds only a weak reference.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.machine.subscribe(move |event| {
            if let Some(shell) = weak.upgrade() {
                shell.handle(event);
            }
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn screen(&self) -> Screen {
        self.state().screen
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.state().display_mode
    }

    pub fn last_completion(&self) -> Option<Completion> {
        self.state().last_completion.clone()
    }

    pub fn machine(&self) -> &TimerMachine {
        &self.machine
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_screen(&self, screen: Screen) {
        self.state().screen = screen;
    }

    pub fn set_display_mode(&self, mode: DisplayMode) {
        self.state().display_mode = mode;
    }

    /// Switch between zen and normal display. Returns the new mode.
    pub fn toggle_zen(&self) -> DisplayMode {
        let mut st = self.state();
        st.display_mode = match st.display_mode {
            DisplayMode::Zen => DisplayMode::Normal,
            DisplayMode::Normal | DisplayMode::Small => DisplayMode::Zen,
        };
        st.display_mode
    }

    /// Start a session from one line such as `write the intro 45m`.
    ///
    /// With a duration this is a predicted session. Intent alone starts a
    /// timebox using the last duration. Empty input starts the idle countdown.
    pub fn submit(&self, input: &str) {
        let parsed = parse_command(input);
        match parsed.seconds {
            Some(seconds) => {
                self.machine
                    .start(parsed.intent, Some(seconds), 0, vec![TAG_PREDICT.to_string()]);
            }
            None if !parsed.intent.is_empty() => {
                let countdown = self
                    .config
                    .read(|c| c.timer.last_duration_secs)
                    .map_or(DEFAULT_COUNTDOWN_SECONDS, |s| s as i64);
                self.machine
                    .start(parsed.intent, None, countdown, vec![TAG_TIMEBOX.to_string()]);
            }
            None => self.machine.reset(),
        }
    }

    /// Adjust so that `target_seconds` remain. No-op when idle.
    pub fn set_remaining(&self, target_seconds: i64) {
        if let Some(computed) = self.machine.computed() {
            self.machine
                .adjust(target_seconds.saturating_sub(computed.remaining));
        }
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn handle(&self, event: &TimerEvent) {
        match event {
            TimerEvent::Started { state } => {
                if let Some(predicted) = state.predicted_seconds {
                    self.config
                        .update(|c| c.timer.last_duration_secs = Some(predicted));
                    if let Err(e) = self.config.persist() {
                        warn!(error = %e, "failed to remember last duration");
                    }
                }
                if state.has_content() {
                    self.set_screen(Screen::Timer);
                }
            }
            TimerEvent::Completed { state, elapsed } => {
                let completion = Completion::new(
                    SessionSnapshot {
                        state: state.clone(),
                        elapsed: *elapsed,
                    },
                    &mut rand::thread_rng(),
                );
                debug!(remark = ?completion.remark, "session completed");
                {
                    let mut st = self.state();
                    st.last_completion = Some(completion);
                    st.screen = Screen::Completion;
                }
                self.machine.reset();
            }
            TimerEvent::Canceled { .. } => {
                self.set_screen(Screen::NewFocus);
                self.machine.reset();
            }
            _ => {}
        }
    }

    fn state(&self) -> MutexGuard<'_, ShellState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Config;
    use crate::timer::{ManualClock, ManualScheduler, TimerSession};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(predicted: Option<u64>, elapsed: i64, tags: &[&str]) -> SessionSnapshot {
        SessionSnapshot {
            state: TimerSession {
                focus_text: "x".into(),
                predicted_seconds: predicted,
                start_time: Utc::now(),
                adjustment_seconds: 0,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            elapsed,
        }
    }

    fn shell() -> (Arc<ManualClock>, Arc<Shell>, Subscription) {
        let clock = Arc::new(ManualClock::default());
        let machine = TimerMachine::new(clock.clone(), Arc::new(ManualScheduler::new()));
        let shell = Shell::new(machine, ConfigHandle::new(Config::default()));
        let sub = shell.attach();
        (clock, shell, sub)
    }

    #[test]
    fn error_percent_signs() {
        assert_eq!(error_percent(&snapshot(Some(100), 150, &[])), Some(50.0));
        assert_eq!(error_percent(&snapshot(Some(100), 80, &[])), Some(-20.0));
        assert_eq!(error_percent(&snapshot(None, 80, &[])), None);
        assert_eq!(error_percent(&snapshot(Some(0), 80, &[])), None);
        assert_eq!(error_percent(&snapshot(Some(100), 80, &[TAG_TIMEBOX])), None);
    }

    #[test]
    fn remark_bands() {
        let mut rng = StdRng::seed_from_u64(7);
        let perfect = ["Perfect!", "Nailed it!", "Spot on!", "Impressive!"];
        assert!(perfect.contains(&completion_remark(-4.0, &mut rng)));
        assert!(["Speed demon!", "That was quick!", "Lightning fast!"]
            .contains(&completion_remark(-40.0, &mut rng)));
        assert!(["Room for improvement", "Keep calibrating", "Getting better"]
            .contains(&completion_remark(40.0, &mut rng)));
        assert!([
            "Did you leave the timer running?",
            "Quite a bit longer",
            "Way off this time"
        ]
        .contains(&completion_remark(120.0, &mut rng)));
    }

    #[test]
    fn error_text() {
        assert_eq!(format_error_percent(0.2), "exactly on time");
        assert_eq!(format_error_percent(12.4), "12% longer than predicted");
        assert_eq!(format_error_percent(-30.0), "30% less time than predicted");
    }

    #[test]
    fn submit_predicted_session_goes_to_timer_and_remembers_duration() {
        let (_, shell, _sub) = shell();
        shell.submit("write the intro 45m");
        let state = shell.machine().state().unwrap();
        assert_eq!(state.focus_text, "write the intro");
        assert_eq!(state.predicted_seconds, Some(2700));
        assert_eq!(state.tags, vec![TAG_PREDICT.to_string()]);
        assert_eq!(shell.screen(), Screen::Timer);
        assert_eq!(shell.config.read(|c| c.timer.last_duration_secs), Some(2700));
    }

    #[test]
    fn submit_intent_only_is_a_timebox_of_last_duration() {
        let (_, shell, _sub) = shell();
        shell.submit("warm up 10m");
        shell.submit("email");
        let state = shell.machine().state().unwrap();
        assert_eq!(state.predicted_seconds, None);
        assert_eq!(state.adjustment_seconds, 600);
        assert_eq!(state.tags, vec![TAG_TIMEBOX.to_string()]);
    }

    #[test]
    fn complete_stores_completion_and_resets() {
        let (clock, shell, _sub) = shell();
        shell.submit("review 10m");
        clock.advance_secs(600);
        let snapshot = shell.machine().complete().unwrap();

        assert_eq!(shell.screen(), Screen::Completion);
        let completion = shell.last_completion().unwrap();
        assert_eq!(completion.snapshot, snapshot);
        assert_eq!(completion.error_percent, Some(0.0));
        assert!(completion.remark.is_some());

        let idle = shell.machine().state().unwrap();
        assert!(!idle.has_content());
        assert_eq!(idle.adjustment_seconds, DEFAULT_COUNTDOWN_SECONDS);
        assert_eq!(shell.screen(), Screen::Completion);
    }

    #[test]
    fn cancel_returns_to_new_focus_and_resets() {
        let (_, shell, _sub) = shell();
        shell.submit("review 10m");
        shell.machine().cancel();
        assert_eq!(shell.screen(), Screen::NewFocus);
        assert!(shell.machine().is_active());
        assert!(shell.last_completion().is_none());
    }

    #[test]
    fn set_remaining_adjusts_to_target() {
        let (clock, shell, _sub) = shell();
        shell.submit("x 25m");
        clock.advance_secs(100);
        shell.set_remaining(300);
        assert_eq!(shell.machine().computed().unwrap().remaining, 300);
    }

    #[test]
    fn zen_toggles_back_to_normal() {
        let (_, shell, _sub) = shell();
        shell.set_display_mode(DisplayMode::Small);
        assert_eq!(shell.toggle_zen(), DisplayMode::Zen);
        assert_eq!(shell.display_mode(), DisplayMode::Zen);
        assert_eq!(shell.toggle_zen(), DisplayMode::Normal);
    }

    #[test]
    fn dropped_shell_stops_reacting() {
        let (_, shell, sub) = shell();
        let machine = shell.machine().clone();
        drop(shell);
        machine.start("x", Some(60), 0, vec![]);
        machine.cancel();
        assert!(!machine.is_active());
        drop(sub);
    }
}
