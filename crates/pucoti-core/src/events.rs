use serde::{Deserialize, Serialize};

use crate::timer::TimerSession;

/// Every state change of the timer machine produces exactly one of these.
///
/// Events are the only way session state becomes visible to subscribers;
/// each variant carries only what that transition needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// A new session replaced whatever was there (also emitted by `reset`).
    Started { state: TimerSession },
    /// The countdown was lengthened or shortened by `delta` seconds.
    Adjusted { delta: i64, state: TimerSession },
    /// Periodic recomputation while a session is active.
    Tick {
        elapsed: i64,
        remaining: i64,
        is_overtime: bool,
    },
    /// `remaining` crossed from non-negative to negative.
    OvertimeEntered { focus_text: String, elapsed: i64 },
    /// `remaining` crossed back to non-negative (after an adjustment).
    OvertimeExited,
    Completed { state: TimerSession, elapsed: i64 },
    Canceled { state: TimerSession, elapsed: i64 },
}

impl TimerEvent {
    /// Stable snake_case name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            TimerEvent::Started { .. } => "started",
            TimerEvent::Adjusted { .. } => "adjusted",
            TimerEvent::Tick { .. } => "tick",
            TimerEvent::OvertimeEntered { .. } => "overtime_entered",
            TimerEvent::OvertimeExited => "overtime_exited",
            TimerEvent::Completed { .. } => "completed",
            TimerEvent::Canceled { .. } => "canceled",
        }
    }

    /// True for the two events that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerEvent::Completed { .. } | TimerEvent::Canceled { .. })
    }
}
