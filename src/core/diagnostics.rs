//! Operator-facing side channel for delivery problems
//!
//! Write failures, queue overflow and shutdown discards are reported here
//! instead of through the log delivery path, so a failing appender can never
//! feed events back into itself.

use super::log_level::LogLevel;
use std::fmt;
use std::sync::Arc;

/// How often overflow alerts repeat after the first one
const OVERFLOW_ALERT_INTERVAL: u64 = 1000;

/// A single diagnostic notice
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An event was lost because the sink rejected the write
    WriteFailure { appender: String, error: String },

    /// The async discard policy dropped an event. `total_dropped` includes it.
    QueueOverflow {
        appender: String,
        level: LogLevel,
        total_dropped: u64,
    },

    /// Rollover failed; the appender keeps writing to the current file
    RotationFailure { appender: String, error: String },

    /// Events still queued when the shutdown timeout expired
    ShutdownDiscard { appender: String, discarded: u64 },

    /// An event was offered to an appender that is not started
    NotStarted { appender: String },

    /// An event was logged after `stop_all`
    RegistryStopped { logger: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::WriteFailure { appender, error } => {
                write!(f, "[LOGGER ERROR] Appender '{}' failed to write: {}", appender, error)
            }
            Diagnostic::QueueOverflow {
                appender,
                level,
                total_dropped,
            } => write!(
                f,
                "[LOGGER WARNING] Appender '{}' queue full, {} events dropped (last at {}). \
                 Consider increasing queue size or lowering the discarding threshold.",
                appender, total_dropped, level
            ),
            Diagnostic::RotationFailure { appender, error } => write!(
                f,
                "[LOGGER WARNING] Appender '{}' rotation failed: {}. Continuing with current file.",
                appender, error
            ),
            Diagnostic::ShutdownDiscard {
                appender,
                discarded,
            } => write!(
                f,
                "[LOGGER WARNING] Appender '{}' did not drain within timeout, {} events discarded",
                appender, discarded
            ),
            Diagnostic::NotStarted { appender } => {
                write!(f, "[LOGGER WARNING] Appender '{}' is not started, event dropped", appender)
            }
            Diagnostic::RegistryStopped { logger } => write!(
                f,
                "[LOGGER WARNING] Registry stopped, event for logger '{}' dropped",
                logger
            ),
        }
    }
}

/// Callback type for diagnostic notifications
pub type DiagnosticCallback = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Cloneable handle to the diagnostic channel
///
/// # Example
///
/// ```
/// use rust_appender_system::{Diagnostic, Diagnostics};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let diagnostics = Diagnostics::with_callback(Arc::new(move |d: &Diagnostic| {
///     sink.lock().unwrap().push(d.clone());
/// }));
///
/// diagnostics.report(Diagnostic::NotStarted { appender: "FILE".into() });
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct Diagnostics {
    callback: Option<DiagnosticCallback>,
    echo_stderr: bool,
}

impl Diagnostics {
    /// Report to stderr only
    pub fn stderr() -> Self {
        Self {
            callback: None,
            echo_stderr: true,
        }
    }

    /// Report to the callback only
    pub fn with_callback(callback: DiagnosticCallback) -> Self {
        Self {
            callback: Some(callback),
            echo_stderr: false,
        }
    }

    /// Discard every notice
    pub fn silent() -> Self {
        Self {
            callback: None,
            echo_stderr: false,
        }
    }

    /// Also echo notices to stderr
    #[must_use]
    pub fn echo_to_stderr(mut self, echo: bool) -> Self {
        self.echo_stderr = echo;
        self
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        if self.echo_stderr {
            eprintln!("{}", diagnostic);
        }
        if let Some(ref callback) = self.callback {
            callback(&diagnostic);
        }
    }

    /// Report a queue drop, throttled to the first drop and every
    /// thousandth one after it. `previous_dropped` is the counter value
    /// before this drop was recorded.
    pub fn report_overflow(&self, appender: &str, level: LogLevel, previous_dropped: u64) {
        let total_dropped = previous_dropped + 1;
        if previous_dropped == 0 || total_dropped % OVERFLOW_ALERT_INTERVAL == 0 {
            self.report(Diagnostic::QueueOverflow {
                appender: appender.to_string(),
                level,
                total_dropped,
            });
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("callback", &self.callback.is_some())
            .field("echo_stderr", &self.echo_stderr)
            .finish()
    }
}
