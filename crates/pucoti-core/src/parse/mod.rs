//! Free-form duration and command input.

mod command;
mod duration;

pub use command::{parse_command, ParsedCommand};
pub use duration::{parse_duration, require_duration};
