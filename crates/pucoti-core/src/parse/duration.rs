use crate::error::ValidationError;

/// Parse a duration into whole seconds.
///
/// Accepted forms:
/// - `12:30` (m:ss) and `1:30:00` (h:mm:ss)
/// - unit forms in h, m, s order: `1h 30m`, `12m 30s`, `1h30m`, `90s`, `1.5h`,
///   with long unit names (`2 hours`, `12 minutes`, `90 sec`)
/// - a bare number, read as minutes: `12`, `1.5`
///
/// Case-insensitive. Returns `None` for anything else.
pub fn parse_duration(input: &str) -> Option<u64> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    if s.contains(':') {
        return parse_colon(&s);
    }
    if let Some(minutes) = parse_number(&s).filter(|(_, rest)| rest.is_empty()) {
        return Some(round_secs(minutes.0 * 60.0));
    }
    parse_units(&s)
}

/// Like [`parse_duration`], but a missing or zero duration is an error.
///
/// # Errors
/// Returns [`ValidationError::InvalidDuration`] when the input is not a
/// positive duration.
pub fn require_duration(input: &str) -> Result<u64, ValidationError> {
    match parse_duration(input) {
        Some(secs) if secs > 0 => Ok(secs),
        _ => Err(ValidationError::InvalidDuration(input.trim().to_string())),
    }
}

fn parse_colon(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split(':').collect();
    let is_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !parts.iter().copied().all(is_digits) || parts[1..].iter().any(|p| p.len() > 2) {
        return None;
    }
    let nums: Vec<u64> = parts.iter().map(|p| p.parse().ok()).collect::<Option<_>>()?;
    match nums.as_slice() {
        [m, sec] if *sec < 60 => m.checked_mul(60)?.checked_add(*sec),
        [h, m, sec] if *m < 60 && *sec < 60 => h.checked_mul(3600)?.checked_add(m * 60 + sec),
        _ => None,
    }
}

/// `\d+(\.\d+)?` at the start of `s`.
fn parse_number(s: &str) -> Option<(f64, &str)> {
    let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if int_len == 0 {
        return None;
    }
    let mut end = int_len;
    if s[end..].starts_with('.') {
        let frac_len = s[end + 1..].bytes().take_while(u8::is_ascii_digit).count();
        if frac_len == 0 {
            return None;
        }
        end += 1 + frac_len;
    }
    Some((s[..end].parse().ok()?, &s[end..]))
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Hours,
    Minutes,
    Seconds,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "h" | "hour" | "hours" => Some(Unit::Hours),
            "m" | "min" | "mins" | "minute" | "minutes" => Some(Unit::Minutes),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Unit::Seconds),
            _ => None,
        }
    }

    fn seconds(self) -> f64 {
        match self {
            Unit::Hours => 3600.0,
            Unit::Minutes => 60.0,
            Unit::Seconds => 1.0,
        }
    }
}

/// One or more `<number><unit>` parts, units strictly in h, m, s order.
fn parse_units(s: &str) -> Option<u64> {
    let mut rest = s;
    let mut last: Option<Unit> = None;
    let mut total = 0.0;

    loop {
        if last.is_some() {
            rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        }
        if rest.is_empty() {
            break;
        }
        let (value, after) = parse_number(rest)?;
        let after = after.trim_start();
        let word_len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        let unit = Unit::from_word(&after[..word_len])?;
        if last.is_some_and(|prev| unit <= prev) {
            return None;
        }
        total += value * unit.seconds();
        last = Some(unit);
        rest = &after[word_len..];
    }

    last.map(|_| round_secs(total))
}

fn round_secs(secs: f64) -> u64 {
    secs.round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_none() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("   "), None);
    }

    #[test]
    fn plain_numbers_are_minutes() {
        assert_eq!(parse_duration("12"), Some(720));
        assert_eq!(parse_duration("1"), Some(60));
        assert_eq!(parse_duration("90"), Some(5400));
        assert_eq!(parse_duration("1.5"), Some(90));
    }

    #[test]
    fn minutes() {
        assert_eq!(parse_duration("12m"), Some(720));
        assert_eq!(parse_duration("12min"), Some(720));
        assert_eq!(parse_duration("12 min"), Some(720));
        assert_eq!(parse_duration("12minutes"), Some(720));
        assert_eq!(parse_duration("1.5m"), Some(90));
    }

    #[test]
    fn seconds() {
        assert_eq!(parse_duration("90s"), Some(90));
        assert_eq!(parse_duration("90sec"), Some(90));
        assert_eq!(parse_duration("90 seconds"), Some(90));
    }

    #[test]
    fn hours() {
        assert_eq!(parse_duration("1h"), Some(3600));
        assert_eq!(parse_duration("1hour"), Some(3600));
        assert_eq!(parse_duration("2 hours"), Some(7200));
        assert_eq!(parse_duration("1.5h"), Some(5400));
    }

    #[test]
    fn compound() {
        assert_eq!(parse_duration("12m 30s"), Some(750));
        assert_eq!(parse_duration("1h 30m"), Some(5400));
        assert_eq!(parse_duration("1h 30m 45s"), Some(5445));
        assert_eq!(parse_duration("1h30m"), Some(5400));
        assert_eq!(parse_duration("2h 15m"), Some(8100));
        assert_eq!(parse_duration("1h, 5m"), Some(3900));
    }

    #[test]
    fn compound_units_must_descend() {
        assert_eq!(parse_duration("30m 1h"), None);
        assert_eq!(parse_duration("5m 5m"), None);
    }

    #[test]
    fn colon_forms() {
        assert_eq!(parse_duration("12:30"), Some(750));
        assert_eq!(parse_duration("1:00"), Some(60));
        assert_eq!(parse_duration("45:00"), Some(2700));
        assert_eq!(parse_duration("0:30"), Some(30));
        assert_eq!(parse_duration("1:30:00"), Some(5400));
        assert_eq!(parse_duration("2:00:00"), Some(7200));
        assert_eq!(parse_duration("1:15:30"), Some(4530));
    }

    #[test]
    fn colon_out_of_range_is_none() {
        assert_eq!(parse_duration("12:60"), None);
        assert_eq!(parse_duration("1:60:00"), None);
        assert_eq!(parse_duration("1:30:60"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("1:030"), None);
    }

    #[test]
    fn colon_overflow_is_none() {
        assert_eq!(parse_duration("400000000000000000:00"), None);
        assert_eq!(parse_duration("6000000000000000:00:00"), None);
        assert_eq!(parse_duration("99999999999999999999:00"), None);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(parse_duration("12M"), Some(720));
        assert_eq!(parse_duration("1H 30M"), Some(5400));
        assert_eq!(parse_duration("90S"), Some(90));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("12x"), None);
        assert_eq!(parse_duration("hello world"), None);
        assert_eq!(parse_duration("1."), None);
        assert_eq!(parse_duration(".5"), None);
    }

    #[test]
    fn require_rejects_zero_and_garbage() {
        assert_eq!(require_duration("25m").unwrap(), 1500);
        assert!(require_duration("0").is_err());
        assert!(require_duration("soon").is_err());
    }
}
