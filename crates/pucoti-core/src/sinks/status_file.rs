use std::path::{Path, PathBuf};

use super::{StatusSink, TimerStatus};
use crate::error::SinkError;

/// Publishes the status as a small JSON file a panel indicator can poll.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never sees a partial document.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "status.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatusSink for StatusFile {
    fn publish(&self, status: &TimerStatus) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(status).map_err(|e| SinkError::CommandFailed {
            command: "encode status".into(),
            message: e.to_string(),
        })?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// For hosts without a status indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn publish(&self, _status: &TimerStatus) -> Result<(), SinkError> {
        Ok(())
    }
}
