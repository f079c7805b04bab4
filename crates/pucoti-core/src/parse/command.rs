use serde::{Deserialize, Serialize};

use super::duration::parse_duration;

/// Intent text and optional duration pulled out of one line of input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub intent: String,
    pub seconds: Option<u64>,
}

/// Split `input` into an intent and a duration.
///
/// Tries, in order: the whole input as a duration; the longest leading run
/// of words that parses (`1h 30m work`); the longest trailing run
/// (`write the intro 45m`). Otherwise everything is intent. Zero-length
/// durations do not count.
pub fn parse_command(input: &str) -> ParsedCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ParsedCommand::default();
    }

    let positive = |s: &str| parse_duration(s).filter(|&secs| secs > 0);

    if let Some(seconds) = positive(trimmed) {
        return ParsedCommand {
            intent: String::new(),
            seconds: Some(seconds),
        };
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();

    for i in (1..=words.len()).rev() {
        if let Some(seconds) = positive(&words[..i].join(" ")) {
            return ParsedCommand {
                intent: words[i..].join(" "),
                seconds: Some(seconds),
            };
        }
    }

    for i in 0..words.len() {
        if let Some(seconds) = positive(&words[i..].join(" ")) {
            return ParsedCommand {
                intent: words[..i].join(" "),
                seconds: Some(seconds),
            };
        }
    }

    ParsedCommand {
        intent: trimmed.to_string(),
        seconds: None,
    }
}
