//! Date handling for deprecation metadata.
//!
//! Deprecation dates arrive as free-form strings: empty, a Unix epoch in
//! seconds, or a calendar date in one of the common HTTP/ISO forms. Header
//! values are always rendered as IMF-fixdate (RFC 9110 HTTP-date) in UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Offset-carrying forms tried after RFC 3339 and RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
];

/// Forms without a zone; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    // IMF-fixdate and RFC 850 once the zone is stripped
    "%a, %d %b %Y %H:%M:%S",
    "%A, %d-%b-%y %H:%M:%S",
    // asctime
    "%a %b %e %H:%M:%S %Y",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Zone designators meaning UTC that chrono's naive formats cannot read.
const UTC_SUFFIXES: &[&str] = &[" GMT", " UTC", " Z", "Z"];

fn epoch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?[0-9]+$").expect("epoch pattern is valid"))
}

/// Format a datetime as an HTTP date.
/// Example: Sun, 06 Nov 1994 08:49:37 GMT
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse a calendar date/time string.
///
/// Accepts RFC 3339, RFC 2822, IMF-fixdate, RFC 850, asctime, ISO-8601 with
/// minute or second precision, and plain dates such as `2024-06-01`,
/// `1 June 2024` or `June 1, 2024`. Inputs without a zone are taken as UTC.
/// Numeric strings are never read as epoch seconds here.
///
/// Results are truncated to whole seconds, the resolution of an HTTP-date.
/// Years outside 0000-9999 do not fit an HTTP-date and are rejected.
pub fn parse_calendar(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    parse_instant(s)
        .and_then(|dt| dt.with_nanosecond(0))
        .filter(|dt| (0..=9999).contains(&dt.year()))
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let without_zone = UTC_SUFFIXES
        .iter()
        .find_map(|suffix| s.strip_suffix(suffix))
        .map(str::trim_end);

    for candidate in without_zone.into_iter().chain([s]) {
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, format) {
                return Some(naive.and_utc());
            }
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(s, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// Whether the input is a plain, optionally signed, integer.
///
/// Decimal and exponent forms (`1.5e9`) are not epoch inputs.
pub fn is_epoch(s: &str) -> bool {
    epoch_pattern().is_match(s)
}

/// Classified `date` input of a deprecated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeprecationDate<'a> {
    /// No date given.
    Absent,
    /// Unix epoch seconds, kept verbatim for the header.
    Epoch {
        raw: &'a str,
        at: Option<DateTime<Utc>>,
    },
    /// A calendar date that parsed.
    Calendar(DateTime<Utc>),
    /// Anything else; passed through unchanged.
    Unparsed(&'a str),
}

impl<'a> DeprecationDate<'a> {
    /// Classify a raw `date` input. Empty strings count as absent.
    pub fn classify(date: Option<&'a str>) -> Self {
        let Some(raw) = date.filter(|d| !d.is_empty()) else {
            return Self::Absent;
        };

        if is_epoch(raw) {
            let at = raw
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            return Self::Epoch { raw, at };
        }

        match parse_calendar(raw) {
            Some(at) => Self::Calendar(at),
            None => Self::Unparsed(raw),
        }
    }

    /// The instant the sunset is ordered against, if one was established.
    pub fn reference(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch { at, .. } => *at,
            Self::Calendar(at) => Some(*at),
            Self::Absent | Self::Unparsed(_) => None,
        }
    }

    /// Value for the `Deprecation` header.
    pub fn header_value(&self) -> String {
        match self {
            Self::Absent => "true".to_string(),
            Self::Epoch { raw, .. } => format!("@{}", raw),
            Self::Calendar(at) => format_http_date(at),
            Self::Unparsed(raw) => (*raw).to_string(),
        }
    }
}
