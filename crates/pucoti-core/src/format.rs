//! Human-readable time strings.

use chrono::{DateTime, Local, Utc};

/// `m:ss` or `h:mm:ss`, with a leading `-` in overtime.
pub fn format_countdown(total_seconds: i64) -> String {
    let sign = if total_seconds < 0 { "-" } else { "" };
    let abs = total_seconds.unsigned_abs();
    let hours = abs / 3600;
    let mins = (abs % 3600) / 60;
    let secs = abs % 60;
    if hours > 0 {
        format!("{sign}{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{sign}{mins}:{secs:02}")
    }
}

/// Compact form: `45s`, `12m`, `12m 30s`, `1h`, `1h 30m`.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    match (hours, mins, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Spelled out for input previews: `1 minute 30 seconds`, `2 hours`.
/// Seconds are dropped once there is an hour.
pub fn format_time_preview(seconds: u64) -> String {
    fn plural(n: u64, unit: &str) -> String {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    }

    if seconds < 60 {
        return plural(seconds, "second");
    }
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if mins > 0 {
        parts.push(plural(mins, "minute"));
    }
    if secs > 0 && hours == 0 {
        parts.push(plural(secs, "second"));
    }
    parts.join(" ")
}

/// Local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
