//! Core error types for pucoti-core.
//!
//! The timer machine itself never fails. Everything here belongs to the
//! collaborators around it: storage, configuration and the side-effect sinks
//! driven by the subscriber coordinators.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pucoti-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session log / key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Notification, status or window sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV import/export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Session log and key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Reading or writing the CSV log failed
    #[error("Session log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV row could not be encoded or decoded
    #[error("Malformed session log: {0}")]
    Csv(#[from] csv::Error),

    /// A stored value could not be decoded
    #[error("Malformed stored value: {0}")]
    Decode(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised by the best-effort side-effect sinks.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink is not available on this host
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// An external command could not be spawned or reported failure
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// IO errors while talking to the sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors for user input handed to the machine by a host.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Input could not be read as a duration
    #[error("Could not parse '{0}' as a duration")]
    InvalidDuration(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Decode(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
