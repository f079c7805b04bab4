//! Session log records and the storage seams the coordinators write through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::timer::TimerSession;

/// How a logged session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Canceled,
    /// The app closed or crashed while the session was running.
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SessionStatus::Completed),
            "canceled" => Ok(SessionStatus::Canceled),
            "unknown" => Ok(SessionStatus::Unknown),
            other => Err(StorageError::Decode(format!("unknown session status '{other}'"))),
        }
    }
}

/// One row of the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// When the session started.
    pub timestamp: DateTime<Utc>,
    pub focus_text: String,
    /// `0` when the session had no prediction.
    pub predicted_seconds: u64,
    pub actual_seconds: u64,
    pub status: SessionStatus,
    pub tags: Vec<String>,
}

impl SessionRecord {
    pub fn from_session(session: &TimerSession, elapsed: i64, status: SessionStatus) -> Self {
        Self {
            timestamp: session.start_time,
            focus_text: session.focus_text.clone(),
            predicted_seconds: session.predicted_seconds.unwrap_or(0),
            actual_seconds: elapsed.max(0) as u64,
            status,
            tags: session.tags.clone(),
        }
    }
}

/// Append-only session history.
pub trait SessionLog: Send + Sync {
    /// # Errors
    /// Returns an error if the record could not be stored.
    fn append(&self, record: &SessionRecord) -> Result<(), StorageError>;
}

/// Marker for the session currently running, kept so a crash can be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub start_time: DateTime<Utc>,
    pub focus_text: String,
    pub predicted_seconds: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&TimerSession> for ActiveSession {
    fn from(session: &TimerSession) -> Self {
        Self {
            start_time: session.start_time,
            focus_text: session.focus_text.clone(),
            predicted_seconds: session.predicted_seconds,
            tags: session.tags.clone(),
        }
    }
}

/// Storage for the single active-session marker.
pub trait ActiveSessionStore: Send + Sync {
    /// # Errors
    /// Returns an error if the marker could not be written.
    fn save_active(&self, session: &ActiveSession) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error if the marker exists but cannot be read.
    fn load_active(&self) -> Result<Option<ActiveSession>, StorageError>;

    /// # Errors
    /// Returns an error if the marker could not be removed.
    fn clear_active(&self) -> Result<(), StorageError>;
}

/// Turn a marker left behind by a crash into an `unknown` log record.
///
/// Elapsed time runs up to `now`. Returns the appended record, or `None`
/// when there was nothing to recover.
///
/// # Errors
/// Returns an error if reading the marker or appending the record fails.
/// The marker is only cleared after a successful append.
pub fn recover_orphaned_session<S>(
    store: &S,
    log: &dyn SessionLog,
    now: DateTime<Utc>,
) -> Result<Option<SessionRecord>, StorageError>
where
    S: ActiveSessionStore + ?Sized,
{
    let Some(active) = store.load_active()? else {
        return Ok(None);
    };

    let record = SessionRecord {
        timestamp: active.start_time,
        focus_text: active.focus_text,
        predicted_seconds: active.predicted_seconds.unwrap_or(0),
        actual_seconds: (now - active.start_time).num_seconds().max(0) as u64,
        status: SessionStatus::Unknown,
        tags: active.tags,
    };
    log.append(&record)?;
    store.clear_active()?;
    tracing::info!(focus_text = %record.focus_text, "recovered orphaned session");
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::{Duration, TimeZone};

    #[test]
    fn status_string_forms() {
        for status in [
            SessionStatus::Completed,
            SessionStatus::Canceled,
            SessionStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("done".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn record_from_session_defaults_missing_prediction_to_zero() {
        let session = TimerSession {
            focus_text: "inbox".into(),
            predicted_seconds: None,
            start_time: Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap(),
            adjustment_seconds: 300,
            tags: vec!["admin".into()],
        };
        let record = SessionRecord::from_session(&session, 42, SessionStatus::Canceled);
        assert_eq!(record.predicted_seconds, 0);
        assert_eq!(record.actual_seconds, 42);
        assert_eq!(record.timestamp, session.start_time);
        assert_eq!(record.tags, vec!["admin".to_string()]);
    }

    #[test]
    fn recover_without_marker_is_noop() {
        let db = Database::open_memory().unwrap();
        assert!(recover_orphaned_session(&db, &db, Utc::now())
            .unwrap()
            .is_none());
        assert!(db.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn recover_appends_unknown_and_clears_marker() {
        let db = Database::open_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
        db.save_active(&ActiveSession {
            start_time: start,
            focus_text: "write report".into(),
            predicted_seconds: Some(1500),
            tags: vec![],
        })
        .unwrap();

        let record = recover_orphaned_session(&db, &db, start + Duration::seconds(1800))
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SessionStatus::Unknown);
        assert_eq!(record.actual_seconds, 1800);
        assert_eq!(record.predicted_seconds, 1500);
        assert!(db.load_active().unwrap().is_none());
        assert_eq!(db.list_sessions().unwrap(), vec![record]);
    }
}
