//! # Pucoti Core Library
//!
//! Business logic for the Pucoti focus timer: you name what you are about to
//! do, predict how long it will take, and the timer tells you how far off you
//! were. The CLI binary is a thin host over this crate.
//!
//! ## Architecture
//!
//! - **Timer machine**: one wall-clock-based session, commands in, a single
//!   ordered stream of [`TimerEvent`]s out
//! - **Subscribers**: independent coordinators (bell, persistence, status,
//!   window) that turn events into side effects and never fail the timer
//! - **Shell**: screen and display-mode state, itself just another subscriber
//! - **Storage**: TOML configuration, SQLite session log with CSV export
//! - **Stats**: calibration of predictions against actual durations
//!
//! ## Key Components
//!
//! - [`TimerMachine`]: core timer state machine
//! - [`App`]: composition root wiring the machine to every subscriber
//! - [`Database`]: session history persistence
//! - [`Config`]: application configuration management

pub mod app;
pub mod error;
pub mod events;
pub mod format;
pub mod parse;
pub mod shell;
pub mod sinks;
pub mod stats;
pub mod storage;
pub mod subscribers;
pub mod timer;

pub use app::{App, AppBuilder};
pub use error::{ConfigError, CoreError, Result, SinkError, StorageError, ValidationError};
pub use events::TimerEvent;
pub use parse::{parse_command, parse_duration, ParsedCommand};
pub use shell::{Completion, DisplayMode, Screen, Shell};
pub use storage::{Config, ConfigHandle, CsvSessionLog, Database, SessionLog, SessionRecord, SessionStatus};
pub use timer::{
    Clock, ManualClock, ManualScheduler, Scheduler, SessionSnapshot, SystemClock, TimerComputed, TimerMachine,
    TimerSession, TokioScheduler,
};
