//! Header generation for deprecated routes.
//!
//! Implements the standard deprecation headers:
//! - Deprecation header (RFC 9745)
//! - Sunset header (RFC 8594)
//! - Link header with `rel="deprecation"` (RFC 8288)
//!
//! Building never fails. Inputs that cannot be honoured drop the affected
//! header and are reported through the [`DiagnosticSink`].

use crate::config::DeprecationConfig;
use crate::dates::{format_http_date, parse_calendar, DeprecationDate};
use crate::diagnostics::DiagnosticSink;
use axum::http::header::LINK;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};

pub const DEPRECATION: HeaderName = HeaderName::from_static("deprecation");
pub const SUNSET: HeaderName = HeaderName::from_static("sunset");

/// What happened to a requested Sunset header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunsetOutcome {
    /// No sunset configured.
    NotRequested,
    /// Header set.
    Set,
    /// The sunset date did not parse.
    Invalid,
    /// The sunset date precedes the deprecation date.
    BeforeDeprecation,
}

impl SunsetOutcome {
    /// Metric label for a rejected sunset.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            Self::Invalid => Some("invalid"),
            Self::BeforeDeprecation => Some("before_deprecation"),
            Self::NotRequested | Self::Set => None,
        }
    }
}

/// Deprecation headers computed for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationHeaders {
    deprecation: HeaderValue,
    link: Option<HeaderValue>,
    sunset: Option<HeaderValue>,
    sunset_outcome: SunsetOutcome,
}

impl DeprecationHeaders {
    /// Build headers from a route's deprecation metadata.
    pub fn build(config: &DeprecationConfig, sink: &dyn DiagnosticSink) -> Self {
        let date = DeprecationDate::classify(config.date());
        let deprecation = deprecation_value(&date, sink);

        let link = config.doc_url().and_then(|url| link_value(url, sink));

        let (sunset, sunset_outcome) = match config.sunset() {
            Some(raw) => sunset_value(raw, date.reference(), sink),
            None => (None, SunsetOutcome::NotRequested),
        };

        Self {
            deprecation,
            link,
            sunset,
            sunset_outcome,
        }
    }

    pub fn deprecation(&self) -> &HeaderValue {
        &self.deprecation
    }

    pub fn link(&self) -> Option<&HeaderValue> {
        self.link.as_ref()
    }

    pub fn sunset(&self) -> Option<&HeaderValue> {
        self.sunset.as_ref()
    }

    pub fn sunset_outcome(&self) -> SunsetOutcome {
        self.sunset_outcome
    }

    /// Write the headers into a header map, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in self.to_vec() {
            headers.insert(name, value);
        }
    }

    /// Headers as name/value pairs in Deprecation, Link, Sunset order.
    pub fn to_vec(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut out = vec![(DEPRECATION, self.deprecation.clone())];
        if let Some(link) = &self.link {
            out.push((LINK, link.clone()));
        }
        if let Some(sunset) = &self.sunset {
            out.push((SUNSET, sunset.clone()));
        }
        out
    }
}

/// Result of annotating a response's headers.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub headers: HeaderMap,
    pub sunset: SunsetOutcome,
}

/// Annotate a header set with deprecation metadata.
///
/// The input is left untouched; the returned map is the input plus the
/// deprecation headers.
pub fn annotate(
    headers: &HeaderMap,
    config: &DeprecationConfig,
    sink: &dyn DiagnosticSink,
) -> Annotation {
    let deprecation = DeprecationHeaders::build(config, sink);
    let mut headers = headers.clone();
    deprecation.apply(&mut headers);

    Annotation {
        headers,
        sunset: deprecation.sunset_outcome(),
    }
}

fn deprecation_value(date: &DeprecationDate<'_>, sink: &dyn DiagnosticSink) -> HeaderValue {
    match HeaderValue::from_str(&date.header_value()) {
        Ok(value) => value,
        Err(_) => {
            // only an unparsed raw input can carry bytes a header cannot hold
            if let DeprecationDate::Unparsed(raw) = date {
                sink.warn(&format!(
                    "Invalid Deprecation header value for deprecated route: {}",
                    raw
                ));
            }
            HeaderValue::from_static("true")
        }
    }
}

fn link_value(url: &str, sink: &dyn DiagnosticSink) -> Option<HeaderValue> {
    let value = format!("<{}>; rel=\"deprecation\"; type=\"text/html\"", url);
    match HeaderValue::from_str(&value) {
        Ok(value) => Some(value),
        Err(_) => {
            sink.warn(&format!(
                "Invalid documentation URL for deprecated route: {}",
                url
            ));
            None
        }
    }
}

fn sunset_value(
    raw: &str,
    deprecated_at: Option<DateTime<Utc>>,
    sink: &dyn DiagnosticSink,
) -> (Option<HeaderValue>, SunsetOutcome) {
    let Some(sunset_at) = parse_calendar(raw) else {
        sink.warn(&format!(
            "Invalid Sunset date format for deprecated route: {}",
            raw
        ));
        return (None, SunsetOutcome::Invalid);
    };

    if deprecated_at.is_some_and(|deprecated_at| sunset_at < deprecated_at) {
        sink.warn(&format!(
            "Sunset date ({}) is before Deprecation date for deprecated route. Sunset header not set.",
            raw
        ));
        return (None, SunsetOutcome::BeforeDeprecation);
    }

    // HTTP-dates are plain ASCII
    let value = HeaderValue::from_str(&format_http_date(&sunset_at)).ok();
    let outcome = if value.is_some() {
        SunsetOutcome::Set
    } else {
        SunsetOutcome::Invalid
    };
    (value, outcome)
}
