//! Plain CSV session log, one row per session.
//!
//! Format: `timestamp,focus_text,predicted_seconds,actual_seconds,status,tags`
//! with the timestamp in local time (`YYYY-MM-DD HH:MM:SS`) and tags joined
//! by `;`.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use super::session::{SessionLog, SessionRecord};
use crate::error::StorageError;

pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "focus_text",
    "predicted_seconds",
    "actual_seconds",
    "status",
    "tags",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Session log backed by a CSV file. The header is written on first append.
#[derive(Debug)]
pub struct CsvSessionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file order. A missing file is an empty log.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        match std::fs::File::open(&self.path) {
            Ok(file) => read_records(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionLog for CsvSessionLog {
    fn append(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;
        write_records(file, std::slice::from_ref(record), needs_header)
    }
}

pub(crate) fn write_records<W: Write>(
    writer: W,
    records: &[SessionRecord],
    header: bool,
) -> Result<(), StorageError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if header {
        wtr.write_record(CSV_HEADER)?;
    }
    for record in records {
        wtr.write_record([
            format_local(record.timestamp),
            record.focus_text.clone(),
            record.predicted_seconds.to_string(),
            record.actual_seconds.to_string(),
            record.status.as_str().to_string(),
            record.tags.join(";"),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn read_records<R: Read>(reader: R) -> Result<Vec<SessionRecord>, StorageError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or("").trim();
        let bad = |what: &str| StorageError::Decode(format!("row {}: bad {what}", line + 2));

        let timestamp = parse_timestamp(field(0)).ok_or_else(|| bad("timestamp"))?;
        let predicted_seconds = field(2).parse().map_err(|_| bad("predicted_seconds"))?;
        let actual_seconds = field(3).parse().map_err(|_| bad("actual_seconds"))?;
        let status = field(4).parse()?;
        let tags = field(5)
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        records.push(SessionRecord {
            timestamp,
            focus_text: row.get(1).unwrap_or("").to_string(),
            predicted_seconds,
            actual_seconds,
            status,
            tags,
        });
    }
    Ok(records)
}

fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

/// Local `YYYY-MM-DD HH:MM:SS`, or RFC 3339.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
