//! Side-effect sinks driven by the subscriber coordinators.
//!
//! Every sink is best-effort: coordinators log a returned error and move on.

mod memory;
mod notifier;
mod status_file;
mod window;

pub use memory::{MemoryNotifier, MemoryStatusSink, MemoryWindowController, NotifierCall, WindowCall};
pub use notifier::{shell_escape, CommandNotifier};
pub use status_file::{NullStatusSink, StatusFile};
pub use window::{
    corner_position, window_controller_for_desktop, NoopWindowController, SwayWindowController,
};

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::storage::WindowConfig;

/// Audible bell and desktop notification.
pub trait NotificationSink: Send + Sync {
    /// Play the bell, `custom_path` first when given.
    fn play_bell(&self, custom_path: Option<&str>) -> Result<(), SinkError>;

    /// Show a desktop notification, through `custom_command` when given.
    fn show_notification(
        &self,
        title: &str,
        body: &str,
        custom_command: Option<&str>,
    ) -> Result<(), SinkError>;
}

/// What a panel or tray indicator sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub running: bool,
    pub remaining_seconds: i64,
    pub focus_text: String,
    pub is_overtime: bool,
}

impl TimerStatus {
    pub fn running(remaining_seconds: i64, focus_text: impl Into<String>, is_overtime: bool) -> Self {
        Self {
            running: true,
            remaining_seconds,
            focus_text: focus_text.into(),
            is_overtime,
        }
    }

    /// The published state when no session runs.
    pub fn stopped() -> Self {
        Self {
            running: false,
            remaining_seconds: 0,
            focus_text: String::new(),
            is_overtime: false,
        }
    }
}

/// External status indicator.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: &TimerStatus) -> Result<(), SinkError>;
}

/// Window layout switching.
pub trait WindowController: Send + Sync {
    /// Small, floating, pinned to the configured corner.
    fn set_compact_mode(&self, window: &WindowConfig) -> Result<(), SinkError>;

    /// Back to the regular layout.
    fn set_normal_mode(&self, window: &WindowConfig) -> Result<(), SinkError>;
}
