use std::path::PathBuf;

use clap::Subcommand;
use pucoti_core::format::{format_duration, format_timestamp};
use pucoti_core::storage::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recent sessions, newest first
    List {
        /// Maximum number of sessions
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write every session to a CSV file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Add sessions from a CSV file, skipping ones already recorded
    Import {
        /// Source file
        path: PathBuf,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        HistoryAction::List { limit, json } => {
            let sessions = db.recent_sessions(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }
            if sessions.is_empty() {
                println!("no sessions yet");
                return Ok(());
            }
            for s in &sessions {
                let predicted = if s.predicted_seconds > 0 {
                    format_duration(s.predicted_seconds)
                } else {
                    "-".to_string()
                };
                println!(
                    "{}  {:<9}  {:>8} / {:<8}  {}",
                    format_timestamp(s.timestamp),
                    s.status.as_str(),
                    format_duration(s.actual_seconds),
                    predicted,
                    s.focus_text,
                );
            }
        }
        HistoryAction::Export { path } => {
            let count = db.export_csv(&path)?;
            println!("exported {count} sessions to {}", path.display());
        }
        HistoryAction::Import { path } => {
            let count = db.import_csv(&path)?;
            println!("imported {count} sessions from {}", path.display());
        }
    }
    Ok(())
}
