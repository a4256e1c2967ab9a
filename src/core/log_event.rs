//! Log event structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// A single log record. Immutable once created; every field is fixed by
/// the constructors and the `with_*` builders consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    thread_id: String,
    thread_name: Option<String>,
    logger: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<LogContext>,
}

impl LogEvent {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so one event always renders as one line.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    /// Create an event stamped with the current time and calling thread
    pub fn new(logger: impl Into<String>, level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            logger: logger.into(),
            message: Self::sanitize_message(message.as_ref()),
            args: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: LogContext) -> Self {
        self.args = Some(args);
        self
    }

    /// Override the timestamp (replaying events, deterministic tests)
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the producing thread's name
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    pub fn logger(&self) -> &str {
        &self.logger
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn args(&self) -> Option<&LogContext> {
        self.args.as_ref()
    }
}
