//! Session data owned by the timer machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Countdown used by the idle session created by `reset()`.
pub const DEFAULT_COUNTDOWN_SECONDS: i64 = 300;

/// One focus run, from `start`/`reset` to `complete`/`cancel`.
///
/// `start_time` never changes for the life of the session. Elapsed and
/// remaining time are always derived from it, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub focus_text: String,
    /// `None` is timebox mode: no target, only the adjustment countdown.
    pub predicted_seconds: Option<u64>,
    pub start_time: DateTime<Utc>,
    pub adjustment_seconds: i64,
    pub tags: Vec<String>,
}

impl TimerSession {
    /// Whole seconds since `start_time` at `now`, never negative.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }

    /// Derived time values at `now`.
    pub fn computed_at(&self, now: DateTime<Utc>) -> TimerComputed {
        let elapsed = self.elapsed_at(now);
        let predicted = i64::try_from(self.predicted_seconds.unwrap_or(0)).unwrap_or(i64::MAX);
        let remaining = predicted
            .saturating_add(self.adjustment_seconds)
            .saturating_sub(elapsed);
        TimerComputed {
            elapsed,
            remaining,
            is_overtime: remaining < 0,
        }
    }

    /// A session with intent or a prediction, as opposed to the idle sentinel.
    pub fn has_content(&self) -> bool {
        !self.focus_text.is_empty() || self.predicted_seconds.is_some()
    }
}

/// Values recomputed from the clock on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerComputed {
    pub elapsed: i64,
    pub remaining: i64,
    pub is_overtime: bool,
}

/// What `complete()`/`cancel()` hand back: the final state and its elapsed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: TimerSession,
    pub elapsed: i64,
}
