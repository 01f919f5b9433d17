//! Canonical text codec primitives shared by every signed/hashed entity.
//!
//! The canonical form is a fixed sequence of `key:value\n` lines in a
//! specified order, UTF-8, LF-only, with a trailing newline terminating the
//! final line and no BOM. Parsers built on top of this module reject
//! unexpected keys, missing keys, and wrong order — never silently accept a
//! reordered or partial document.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

pub mod domain;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing required key `{0}`")]
    MissingKey(String),
    #[error("unexpected key `{0}`")]
    UnexpectedKey(String),
    #[error("expected key `{expected}` at this position, found `{found}`")]
    WrongOrder { expected: String, found: String },
    #[error("invalid hex value for key `{0}`")]
    InvalidHex(String),
    #[error("wrong field count: expected {expected}, found {actual}")]
    WrongFieldCount { expected: usize, actual: usize },
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error("malformed line, expected `key:value`: `{0}`")]
    MalformedLine(String),
    #[error("trailing data after the expected fields")]
    TrailingData,
    #[error("canonical text must be non-empty")]
    Empty,
}

/// Split canonical text into its `key:value` lines, enforcing LF-only line
/// endings and a single trailing newline on the final line.
pub fn split_lines(text: &str) -> Result<Vec<&str>, FormatError> {
    if text.is_empty() {
        return Err(FormatError::Empty);
    }
    if text.contains('\r') {
        return Err(FormatError::MalformedLine("carriage return present".to_string()));
    }
    if !text.ends_with('\n') {
        return Err(FormatError::MalformedLine("missing trailing newline".to_string()));
    }
    let body = &text[..text.len() - 1];
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(body.split('\n').collect())
}

/// Split a `key:value` line, failing if there is no `:`.
pub fn parse_kv(line: &str) -> Result<(&str, &str), FormatError> {
    line.split_once(':').ok_or_else(|| FormatError::MalformedLine(line.to_string()))
}

/// Parse the next line as `key:value`, requiring `key` to match exactly.
pub fn expect_kv<'a>(line: &'a str, key: &str) -> Result<&'a str, FormatError> {
    let (k, v) = parse_kv(line)?;
    if k != key {
        return Err(FormatError::WrongOrder { expected: key.to_string(), found: k.to_string() });
    }
    Ok(v)
}

/// Decode a 64-hex digest field, tagging a decode failure with `field` name.
pub fn parse_hex_field(value: &str, field: &str) -> Result<hashing::Digest, FormatError> {
    hashing::from_hex(value).map_err(|_| FormatError::InvalidHex(field.to_string()))
}

/// Append-only builder for canonical `key:value\n` text.
#[derive(Default)]
pub struct CanonicalWriter {
    buf: String,
}

impl CanonicalWriter {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn line(&mut self, key: &str, value: &str) -> &mut Self {
        self.buf.push_str(key);
        self.buf.push(':');
        self.buf.push_str(value);
        self.buf.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// ISO-8601 UTC, `Z`-suffixed, no fractional seconds. The one routine used
/// everywhere a timestamp is rendered to canonical text.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a timestamp produced by [`format_timestamp`]. Rejects fractional
/// seconds, missing `Z`, or any other ISO-8601 variant not emitted here.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, FormatError> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .map_err(|_| FormatError::InvalidTimestamp(s.to_string()))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap();
        let s = format_timestamp(&dt);
        assert_eq!(s, "2024-01-15T12:30:00Z");
        assert_eq!(parse_timestamp(&s).unwrap(), dt);
    }

    #[test]
    fn rejects_fractional_seconds() {
        assert!(parse_timestamp("2024-01-15T12:30:00.500Z").is_err());
    }

    #[test]
    fn split_lines_requires_trailing_newline() {
        assert_eq!(
            split_lines("a:b"),
            Err(FormatError::MalformedLine("missing trailing newline".to_string()))
        );
    }

    #[test]
    fn split_lines_rejects_cr() {
        assert!(split_lines("a:b\r\n").is_err());
    }

    #[test]
    fn expect_kv_enforces_key() {
        assert_eq!(expect_kv("version:1", "version").unwrap(), "1");
        assert!(expect_kv("version:1", "url").is_err());
    }

    #[test]
    fn writer_produces_lf_terminated_lines() {
        let mut w = CanonicalWriter::new();
        w.line("a", "1").line("b", "2");
        assert_eq!(w.finish(), "a:1\nb:2\n");
    }
}
