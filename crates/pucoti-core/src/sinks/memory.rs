//! Sinks that record what they were asked to do, for headless hosts and tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{NotificationSink, StatusSink, TimerStatus, WindowController};
use crate::error::SinkError;
use crate::storage::WindowConfig;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn check(failing: &AtomicBool, what: &str) -> Result<(), SinkError> {
    if failing.load(Ordering::SeqCst) {
        Err(SinkError::Unavailable(format!("{what} switched off")))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Bell {
        custom_path: Option<String>,
    },
    Notification {
        title: String,
        body: String,
        custom_command: Option<String>,
    },
}

/// Records bells and notifications.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    calls: Mutex<Vec<NotifierCall>>,
    failing: AtomicBool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        lock(&self.calls).clone()
    }

    pub fn bell_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, NotifierCall::Bell { .. }))
            .count()
    }

    /// Make every later call fail (after recording it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl NotificationSink for MemoryNotifier {
    fn play_bell(&self, custom_path: Option<&str>) -> Result<(), SinkError> {
        lock(&self.calls).push(NotifierCall::Bell {
            custom_path: custom_path.map(String::from),
        });
        check(&self.failing, "bell")
    }

    fn show_notification(
        &self,
        title: &str,
        body: &str,
        custom_command: Option<&str>,
    ) -> Result<(), SinkError> {
        lock(&self.calls).push(NotifierCall::Notification {
            title: title.to_string(),
            body: body.to_string(),
            custom_command: custom_command.map(String::from),
        });
        check(&self.failing, "notifications")
    }
}

/// Records every published status.
#[derive(Debug, Default)]
pub struct MemoryStatusSink {
    published: Mutex<Vec<TimerStatus>>,
    failing: AtomicBool,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<TimerStatus> {
        lock(&self.published).clone()
    }

    pub fn last(&self) -> Option<TimerStatus> {
        lock(&self.published).last().cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl StatusSink for MemoryStatusSink {
    fn publish(&self, status: &TimerStatus) -> Result<(), SinkError> {
        lock(&self.published).push(status.clone());
        check(&self.failing, "status")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCall {
    Compact,
    Normal,
}

/// Records layout switches.
#[derive(Debug, Default)]
pub struct MemoryWindowController {
    calls: Mutex<Vec<WindowCall>>,
    failing: AtomicBool,
}

impl MemoryWindowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        lock(&self.calls).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl WindowController for MemoryWindowController {
    fn set_compact_mode(&self, _window: &WindowConfig) -> Result<(), SinkError> {
        lock(&self.calls).push(WindowCall::Compact);
        check(&self.failing, "window")
    }

    fn set_normal_mode(&self, _window: &WindowConfig) -> Result<(), SinkError> {
        lock(&self.calls).push(WindowCall::Normal);
        check(&self.failing, "window")
    }
}
