//! Turns loosely-typed scan payloads into [`CanonicalRecord`]s.
//!
//! Everything here is pure: no I/O, no clock. Malformed input never produces
//! an error; the worst case is the processing-error placeholder record.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::scan::record::{CanonicalRecord, UNTITLED};
use crate::scan::util::truncate_with_ellipsis;
use crate::scan::warn::{self, WarnEvent};

pub const TITLE_MAX_CHARS: usize = 200;
pub const AUTHOR_MAX_CHARS: usize = 100;
pub const PUBLISHER_MAX_CHARS: usize = 100;
pub const ABSTRACT_MAX_CHARS: usize = 500;
pub const DATE_FALLBACK_MAX_CHARS: usize = 20;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static MARKUP_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("valid markup tag regex"));
static ABSOLUTE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^https?://[^\s<>"{}|\\^`\[\]]+"#).expect("valid absolute url regex")
});
static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://").expect("valid scheme regex"));

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy)]
enum DateLayout {
    YearMonthDay,
    MonthDayYear,
    MonthName,
}

static DATE_PATTERNS: Lazy<Vec<(Regex, DateLayout)>> = Lazy::new(|| {
    [
        (r"([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})", DateLayout::YearMonthDay),
        (r"([0-9]{1,2})/([0-9]{1,2})/([0-9]{4})", DateLayout::MonthDayYear),
        (r"([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})", DateLayout::MonthDayYear),
        (r"([A-Z][a-z]+)\s+([0-9]{1,2}),\s+([0-9]{4})", DateLayout::MonthName),
    ]
    .into_iter()
    .map(|(pattern, layout)| (Regex::new(pattern).expect("valid date regex"), layout))
    .collect()
});

/// Normalize one raw scan payload.
///
/// Non-object payloads yield [`CanonicalRecord::processing_error`].
pub fn normalize(raw: &Value) -> CanonicalRecord {
    let Some(fields) = raw.as_object() else {
        warn::emit(WarnEvent {
            code: "INPUT_MALFORMED",
            stage: "normalize",
            action: "store-placeholder",
            target: value_kind(raw),
            reason: "payload-is-not-an-object",
            err: "",
        });
        return CanonicalRecord::processing_error();
    };
    let text = |key: &str| fields.get(key).and_then(Value::as_str);

    let mut title = clean_text(text("title"), Some(TITLE_MAX_CHARS));
    if title.is_empty() {
        title = UNTITLED.to_string();
    }

    let mut publisher = clean_text(text("publisher"), Some(PUBLISHER_MAX_CHARS));
    if publisher.is_empty() {
        if let Some(url) = text("url").filter(|url| !url.is_empty()) {
            publisher = extract_domain(url);
        }
    }

    let record = CanonicalRecord {
        title,
        author: clean_text(text("author"), Some(AUTHOR_MAX_CHARS)),
        publisher,
        date: normalize_date(text("date")),
        abstract_text: clean_text(text("abstract"), Some(ABSTRACT_MAX_CHARS)),
        url: clean_url(text("url")),
    };
    log::debug!(
        "event=normalize status=ok title_chars={} date={}",
        record.title.chars().count(),
        record.date
    );
    record
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip markup, decode entities, collapse whitespace, trim and truncate.
pub fn clean_text(input: Option<&str>, max_chars: Option<usize>) -> String {
    let Some(input) = input.filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let without_tags = MARKUP_TAG_RE.replace_all(input, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    let collapsed = WHITESPACE_RE.replace_all(&decoded, " ");
    let trimmed = collapsed.trim();
    match max_chars {
        Some(limit) => truncate_with_ellipsis(trimmed, limit),
        None => trimmed.to_string(),
    }
}

/// Keep absolute http(s) URLs as they are, otherwise prefix `https://`.
///
/// The coerced value is returned even if it still does not look like a URL.
pub fn clean_url(input: Option<&str>) -> String {
    let Some(url) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    if ABSOLUTE_URL_RE.is_match(url) {
        return url.to_string();
    }

    let coerced = if url.starts_with("www.")
        || !(url.starts_with("http://") || url.starts_with("https://"))
    {
        format!("https://{url}")
    } else {
        url.to_string()
    };
    if !ABSOLUTE_URL_RE.is_match(&coerced) {
        log::debug!("event=normalize_url status=unvalidated url={coerced}");
    }
    coerced
}

/// Host part of a URL, used as publisher fallback.
pub fn extract_domain(url: &str) -> String {
    let without_scheme = SCHEME_RE.replace(url.trim(), "");
    let host = without_scheme.split('/').next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Render any recognized date as `YYYY-MM-DD`.
pub fn normalize_date(input: Option<&str>) -> String {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    for (pattern, layout) in DATE_PATTERNS.iter() {
        let Some(caps) = pattern.captures(raw) else {
            continue;
        };
        if let Some(date) = date_from_captures(&caps, *layout) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    clean_text(Some(raw), Some(DATE_FALLBACK_MAX_CHARS))
}

fn date_from_captures(caps: &Captures<'_>, layout: DateLayout) -> Option<NaiveDate> {
    let number = |idx: usize| caps.get(idx)?.as_str().parse::<u32>().ok();
    let date = match layout {
        DateLayout::YearMonthDay => {
            NaiveDate::from_ymd_opt(i32::try_from(number(1)?).ok()?, number(2)?, number(3)?)
        }
        DateLayout::MonthDayYear => {
            NaiveDate::from_ymd_opt(i32::try_from(number(3)?).ok()?, number(1)?, number(2)?)
        }
        DateLayout::MonthName => {
            // chrono's %B also takes "Oct"; only full names count here.
            if !MONTH_NAMES.contains(&&caps[1]) {
                return None;
            }
            let candidate = format!("{} {}, {}", &caps[1], &caps[2], &caps[3]);
            NaiveDate::parse_from_str(&candidate, "%B %d, %Y").ok()
        }
    };
    date.filter(|date| date.year() >= 1)
}
