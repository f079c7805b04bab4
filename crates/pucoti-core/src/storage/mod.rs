mod config;
mod csv_log;
pub mod database;
mod session;

pub use config::{
    Config, ConfigHandle, Corner, NotificationsConfig, StatusConfig, TimerConfig, WindowConfig,
    WindowStartMode,
};
pub use csv_log::{CsvSessionLog, CSV_HEADER};
pub use database::Database;
pub use session::{
    recover_orphaned_session, ActiveSession, ActiveSessionStore, SessionLog, SessionRecord,
    SessionStatus,
};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the pucoti data directory, creating it when missing.
///
/// `PUCOTI_DATA_DIR` wins when set. Otherwise `~/.config/pucoti`, or
/// `~/.config/pucoti-dev` with `PUCOTI_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("PUCOTI_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("PUCOTI_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pucoti-dev")
            } else {
                base_dir.join("pucoti")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
