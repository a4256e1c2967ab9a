//! Appender trait for log output destinations

use super::{
    diagnostics::{Diagnostic, Diagnostics},
    error::{LoggerError, Result},
    log_event::LogEvent,
    metrics::AppenderMetrics,
};
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of an appender: `Created -> Started -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Started,
    Stopped,
}

/// Atomic holder for a [`LifecycleState`]
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    const CREATED: u8 = 0;
    const STARTED: u8 = 1;
    const STOPPED: u8 = 2;

    pub const fn new() -> Self {
        Self(AtomicU8::new(Self::CREATED))
    }

    pub fn state(&self) -> LifecycleState {
        match self.0.load(Ordering::Acquire) {
            Self::CREATED => LifecycleState::Created,
            Self::STARTED => LifecycleState::Started,
            _ => LifecycleState::Stopped,
        }
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.0.load(Ordering::Acquire) == Self::STARTED
    }

    /// Move `Created -> Started`. Returns false if the appender was not in
    /// the created state.
    pub fn mark_started(&self) -> bool {
        self.0
            .compare_exchange(Self::CREATED, Self::STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move to `Stopped`. Returns false if it already was.
    pub fn mark_stopped(&self) -> bool {
        self.0.swap(Self::STOPPED, Ordering::AcqRel) != Self::STOPPED
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A named sink for log events.
///
/// Appenders are shared (`Arc<dyn Appender>`) between logger bindings and
/// async wrappers, so every method takes `&self` and each implementation
/// guards its own resource with its own lock.
pub trait Appender: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> LifecycleState;

    /// Acquire the underlying resource. Starting an already started
    /// appender is a no-op.
    fn start(&self) -> Result<()>;

    /// Write or enqueue one event, reporting failures to the caller
    fn append(&self, event: &LogEvent) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Drain, flush and release the underlying resource
    fn stop(&self) -> Result<()>;

    fn metrics(&self) -> &AppenderMetrics;

    fn diagnostics(&self) -> &Diagnostics;

    /// Deliver an event without ever failing the caller.
    ///
    /// Outcomes are folded into the metrics and the diagnostic channel:
    /// queue overflow counts as a drop, anything else as a write failure.
    fn deliver(&self, event: &LogEvent) {
        match self.append(event) {
            Ok(()) => {
                self.metrics().record_delivered();
            }
            Err(LoggerError::QueueOverflow { .. }) => {
                let previous = self.metrics().record_dropped();
                self.diagnostics()
                    .report_overflow(self.name(), event.level(), previous);
            }
            Err(LoggerError::AppenderNotStarted { .. }) => {
                self.metrics().record_dropped();
                self.diagnostics().report(Diagnostic::NotStarted {
                    appender: self.name().to_string(),
                });
            }
            Err(e) => {
                self.metrics().record_write_failure();
                self.diagnostics().report(Diagnostic::WriteFailure {
                    appender: self.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Created);

        assert!(lifecycle.mark_started());
        assert!(!lifecycle.mark_started());
        assert!(lifecycle.is_started());

        assert!(lifecycle.mark_stopped());
        assert!(!lifecycle.mark_stopped());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        // Stopped is terminal
        assert!(!lifecycle.mark_started());
    }
}
