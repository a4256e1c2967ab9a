//! Console appender implementation

use crate::core::{
    Appender, AppenderMetrics, ConsoleTarget, Diagnostics, Lifecycle, LifecycleState, LogEvent,
    LoggerError, Result,
};
use crate::encoder::PatternEncoder;
use parking_lot::Mutex;
use std::io::Write;

/// Writes formatted events to stdout or stderr.
///
/// Each record is written and flushed under the appender's lock, so lines
/// from concurrent producers never interleave.
pub struct ConsoleAppender {
    name: String,
    encoder: PatternEncoder,
    writer: Mutex<Box<dyn Write + Send>>,
    lifecycle: Lifecycle,
    metrics: AppenderMetrics,
    diagnostics: Diagnostics,
}

impl ConsoleAppender {
    pub fn new(
        name: impl Into<String>,
        encoder: PatternEncoder,
        target: ConsoleTarget,
        diagnostics: Diagnostics,
    ) -> Self {
        let writer: Box<dyn Write + Send> = match target {
            ConsoleTarget::Stdout => Box::new(std::io::stdout()),
            ConsoleTarget::Stderr => Box::new(std::io::stderr()),
        };
        Self::with_writer(name, encoder, writer, diagnostics)
    }

    /// Write to an arbitrary sink instead of a standard stream
    ///
    /// # Example
    ///
    /// ```
    /// use rust_appender_system::appenders::ConsoleAppender;
    /// use rust_appender_system::{Appender, Diagnostics, LogEvent, LogLevel, PatternEncoder};
    ///
    /// let appender = ConsoleAppender::with_writer(
    ///     "MEMORY",
    ///     PatternEncoder::new("%msg%n").unwrap(),
    ///     Box::new(Vec::new()),
    ///     Diagnostics::silent(),
    /// );
    /// appender.start().unwrap();
    /// appender.deliver(&LogEvent::new("app", LogLevel::Info, "hello"));
    /// assert_eq!(appender.metrics().delivered(), 1);
    /// ```
    pub fn with_writer(
        name: impl Into<String>,
        encoder: PatternEncoder,
        writer: Box<dyn Write + Send>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            name: name.into(),
            encoder,
            writer: Mutex::new(writer),
            lifecycle: Lifecycle::new(),
            metrics: AppenderMetrics::new(),
            diagnostics,
        }
    }

    pub fn encoder(&self) -> &PatternEncoder {
        &self.encoder
    }
}

impl Appender for ConsoleAppender {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn start(&self) -> Result<()> {
        if self.lifecycle.state() == LifecycleState::Stopped {
            return Err(LoggerError::config(
                "ConsoleAppender",
                format!("appender '{}' was stopped and cannot be restarted", self.name),
            ));
        }
        self.lifecycle.mark_started();
        Ok(())
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        if !self.lifecycle.is_started() {
            return Err(LoggerError::not_started(&self.name));
        }

        let record = self.encoder.format(event);
        let mut writer = self.writer.lock();
        writer
            .write_all(record.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| LoggerError::write_failure(&self.name, e.to_string()))
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if self.lifecycle.mark_stopped() {
            self.writer.lock().flush()?;
        }
        Ok(())
    }

    fn metrics(&self) -> &AppenderMetrics {
        &self.metrics
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
