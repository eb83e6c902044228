//! Timestamp extraction from the fixed-width line prefix.
//!
//! Every input line starts with a timestamp field of `prefix_len` bytes. Lines
//! shorter than the prefix contribute their whole text. Trailing whitespace in
//! the field is ignored, so a narrower timestamp padded with spaces still parses.
//! Under `iso8601` a field may also hold a shorter date-time followed by
//! whitespace and message text; only the leading date-time is read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layouts with an explicit offset, tried after strict RFC 3339.
const OFFSET_ISO_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Naive layouts accepted by `TimestampFormat::Iso8601`, read as UTC.
const NAIVE_ISO_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Ordering key derived from a line's timestamp field.
///
/// A single merge only ever produces one variant (one parser per run).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timestamp {
    Instant(DateTime<Utc>),
    Lexical(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Instant(t) => write!(f, "{}", t.to_rfc3339()),
            Timestamp::Lexical(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse timestamp field '{field}': {reason}")]
pub struct TimestampError {
    pub field: String,
    pub reason: String,
}

impl TimestampError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// How the timestamp field is interpreted.
///
/// Textual forms (config files, env, CLI): `iso8601`, `rfc3339`, `lexical`,
/// or any strftime pattern containing `%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum TimestampFormat {
    /// RFC 3339 with offset, or a naive ISO date-time taken as UTC.
    #[default]
    Iso8601,
    /// Strict RFC 3339 only.
    Rfc3339,
    /// chrono strftime pattern; patterns without an offset are taken as UTC.
    Pattern(String),
    /// No parsing: the raw field is compared bytewise.
    Lexical,
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "iso8601" | "iso" => Ok(Self::Iso8601),
            "rfc3339" => Ok(Self::Rfc3339),
            "lexical" => Ok(Self::Lexical),
            p if p.contains('%') => Ok(Self::Pattern(p.to_string())),
            other => Err(format!(
                "unknown timestamp format '{other}' (expected iso8601, rfc3339, lexical, or a strftime pattern)"
            )),
        }
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimestampFormat> for String {
    fn from(f: TimestampFormat) -> Self {
        f.to_string()
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso8601 => f.write_str("iso8601"),
            Self::Rfc3339 => f.write_str("rfc3339"),
            Self::Pattern(p) => f.write_str(p),
            Self::Lexical => f.write_str("lexical"),
        }
    }
}

/// Extracts and parses the timestamp prefix of a line.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    prefix_len: usize,
    format: TimestampFormat,
}

impl TimestampParser {
    pub fn new(prefix_len: usize, format: TimestampFormat) -> Self {
        Self { prefix_len, format }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn format(&self) -> &TimestampFormat {
        &self.format
    }

    /// The raw timestamp field of `line`.
    ///
    /// A prefix boundary inside a multi-byte character moves back to the
    /// start of that character.
    pub fn field<'a>(&self, line: &'a str) -> Result<&'a str, TimestampError> {
        let mut end = self.prefix_len.min(line.len());
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        let field = line[..end].trim_end();
        if field.is_empty() {
            return Err(TimestampError::new(field, "empty timestamp field"));
        }
        Ok(field)
    }

    pub fn parse(&self, line: &str) -> Result<Timestamp, TimestampError> {
        let field = self.field(line)?;
        match &self.format {
            TimestampFormat::Lexical => Ok(Timestamp::Lexical(field.to_string())),
            TimestampFormat::Rfc3339 => DateTime::parse_from_rfc3339(field)
                .map(|t| Timestamp::Instant(t.with_timezone(&Utc)))
                .map_err(|e| TimestampError::new(field, e.to_string())),
            TimestampFormat::Iso8601 => parse_iso8601(field),
            TimestampFormat::Pattern(pattern) => parse_pattern(field, pattern),
        }
    }
}

fn parse_iso8601(field: &str) -> Result<Timestamp, TimestampError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(field) {
        return Ok(Timestamp::Instant(t.with_timezone(&Utc)));
    }
    for layout in OFFSET_ISO_LAYOUTS {
        if let Ok((t, rest)) = DateTime::parse_and_remainder(field, layout) {
            if ends_at_word_break(rest) {
                return Ok(Timestamp::Instant(t.with_timezone(&Utc)));
            }
        }
    }
    for layout in NAIVE_ISO_LAYOUTS {
        if let Ok((t, rest)) = NaiveDateTime::parse_and_remainder(field, layout) {
            if ends_at_word_break(rest) {
                return Ok(Timestamp::Instant(t.and_utc()));
            }
        }
    }
    Err(TimestampError::new(field, "not an ISO 8601 date-time"))
}

/// The date-time must be followed by nothing or by whitespace.
fn ends_at_word_break(rest: &str) -> bool {
    rest.chars().next().map_or(true, char::is_whitespace)
}

fn parse_pattern(field: &str, pattern: &str) -> Result<Timestamp, TimestampError> {
    if let Ok(t) = DateTime::parse_from_str(field, pattern) {
        return Ok(Timestamp::Instant(t.with_timezone(&Utc)));
    }
    match NaiveDateTime::parse_from_str(field, pattern) {
        Ok(t) => Ok(Timestamp::Instant(t.and_utc())),
        Err(e) => {
            // Date-only patterns mean midnight UTC.
            NaiveDate::parse_from_str(field, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| Timestamp::Instant(t.and_utc()))
                .ok_or_else(|| TimestampError::new(field, format!("pattern '{pattern}': {e}")))
        }
    }
}
