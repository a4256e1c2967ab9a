//! Pattern encoder
//!
//! Turns a logback-style layout pattern into a compiled list of segments
//! once, then renders events against it.
//!
//! ```
//! use rust_appender_system::{LogEvent, LogLevel, PatternEncoder};
//!
//! let encoder = PatternEncoder::new("%-5level %logger{0} - %msg%n").unwrap();
//! let event = LogEvent::new("com.example.Service", LogLevel::Info, "ready");
//!
//! assert_eq!(encoder.format(&event), "INFO  Service - ready\n");
//! ```

mod converter;
mod pattern;

use crate::core::{LogEvent, Result};
use converter::Segment;

/// Layout used when a descriptor does not name one
pub const DEFAULT_PATTERN: &str =
    "%d{%Y-%m-%d %H:%M:%S%.3f} [%thread] %-5level %logger{36} - %msg%n";

/// A compiled layout pattern
#[derive(Debug, Clone)]
pub struct PatternEncoder {
    pattern: String,
    segments: Vec<Segment>,
}

impl PatternEncoder {
    /// Compile `pattern`. Unknown conversion words, malformed modifiers and
    /// unbalanced braces fail here rather than at format time.
    pub fn new(pattern: &str) -> Result<Self> {
        let segments = pattern::parse(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn format(&self, event: &LogEvent) -> String {
        let mut out = String::with_capacity(128);
        for segment in &self.segments {
            segment.write(event, &mut out);
        }
        out
    }
}

impl Default for PatternEncoder {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            segments: pattern::parse(DEFAULT_PATTERN).unwrap_or_default(),
        }
    }
}

impl PartialEq for PatternEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
