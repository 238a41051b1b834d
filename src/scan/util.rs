use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::time::SystemTime;

/// Truncate `input` so the result never exceeds `max_chars` characters.
///
/// When truncation happens the text is cut back to the last word boundary
/// (if there is one) and `...` takes the place of the removed tail.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let keep = max_chars.saturating_sub(SUFFIX.len());
    let head: String = input.chars().take(keep).collect();
    let head = match head.rsplit_once(' ') {
        Some((before, _)) if !before.trim().is_empty() => before.trim_end().to_string(),
        _ => head,
    };
    format!("{head}{SUFFIX}")
}

pub fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// RFC 3339 timestamp with microseconds, rendered in the given zone.
pub fn iso_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
