//! Timestamp formatting for the `%d` converter
//!
//! Supports ISO 8601, RFC 3339, Unix timestamps, and custom strftime formats.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Timestamp format selected by the option of a `%d{...}` token
///
/// # Examples
///
/// ```
/// use rust_appender_system::core::TimestampFormat;
///
/// assert_eq!(TimestampFormat::from_option(None), TimestampFormat::Iso8601);
/// assert_eq!(
///     TimestampFormat::from_option(Some("UNIX_MILLIS")),
///     TimestampFormat::UnixMillis
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// ISO 8601 with microseconds: `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// RFC 3339 format: `2025-01-08T10:30:45+00:00`
    Rfc3339,

    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Unix timestamp in microseconds: `1736332245123456`
    UnixMicros,

    /// Custom strftime format, rendered in local time
    Custom(String),
}

impl TimestampFormat {
    /// Resolve the option text of a `%d{...}` token.
    ///
    /// Named formats are matched case-insensitively; anything else is
    /// treated as a strftime string.
    #[must_use]
    pub fn from_option(option: Option<&str>) -> Self {
        let Some(option) = option else {
            return TimestampFormat::Iso8601;
        };
        match option.to_uppercase().as_str() {
            "" | "ISO8601" => TimestampFormat::Iso8601,
            "ISO8601_MICROS" => TimestampFormat::Iso8601Micros,
            "RFC3339" => TimestampFormat::Rfc3339,
            "UNIX" => TimestampFormat::Unix,
            "UNIX_MILLIS" => TimestampFormat::UnixMillis,
            "UNIX_MICROS" => TimestampFormat::UnixMicros,
            _ => TimestampFormat::Custom(option.to_string()),
        }
    }

    /// Check that a custom strftime string only uses known specifiers
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let TimestampFormat::Custom(format_str) = self {
            let has_error = chrono::format::StrftimeItems::new(format_str)
                .any(|item| matches!(item, chrono::format::Item::Error));
            if has_error {
                return Err(format!("invalid strftime format '{}'", format_str));
            }
        }
        Ok(())
    }

    /// Format a `DateTime<Utc>` according to this format
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        let mut out = String::new();
        self.write_to(&mut out, datetime);
        out
    }

    /// Append the formatted timestamp to `out`
    pub fn write_to(&self, out: &mut String, datetime: &DateTime<Utc>) {
        // Writing to a String cannot fail; validated formats cannot either.
        let _ = match self {
            TimestampFormat::Iso8601 => write!(out, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            TimestampFormat::Iso8601Micros => {
                write!(out, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
            }
            TimestampFormat::Rfc3339 => write!(out, "{}", datetime.to_rfc3339()),
            TimestampFormat::Unix => write!(out, "{}", datetime.timestamp()),
            TimestampFormat::UnixMillis => write!(out, "{}", datetime.timestamp_millis()),
            TimestampFormat::UnixMicros => write!(out, "{}", datetime.timestamp_micros()),
            TimestampFormat::Custom(format_str) => {
                write!(out, "{}", datetime.with_timezone(&Local).format(format_str))
            }
        };
    }
}
