//! Bounded-queue asynchronous appender
//!
//! Producers hand events to a bounded channel and return immediately; one
//! dedicated thread forwards them, in order, to the wrapped appender.
//! Occupancy decides what gets queued:
//!
//! | queue length `len`        | outcome                                  |
//! |---------------------------|------------------------------------------|
//! | `len < threshold`         | queued                                   |
//! | `threshold <= len < cap`  | queued only if level >= discard floor    |
//! | `len == cap`              | dropped                                  |

use crate::core::{
    Appender, AppenderMetrics, AsyncSettings, Diagnostic, Diagnostics, Lifecycle, LifecycleState,
    LogEvent, LogLevel, LoggerError, Result,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Wraps another appender behind a bounded queue and a consumer thread
pub struct AsyncAppender {
    name: String,
    wrapped: Arc<dyn Appender>,
    capacity: usize,
    discarding_threshold: usize,
    discard_floor: LogLevel,
    shutdown_timeout: Duration,
    /// `None` once stop has closed the queue
    sender: RwLock<Option<Sender<LogEvent>>>,
    /// Kept to drain leftovers when the consumer misses the deadline
    receiver: Receiver<LogEvent>,
    handle: Mutex<Option<JoinHandle<()>>>,
    abandoned: Arc<AtomicBool>,
    lifecycle: Lifecycle,
    metrics: Arc<AppenderMetrics>,
    diagnostics: Diagnostics,
}

impl AsyncAppender {
    /// Create the wrapper. The queue exists from here on, the consumer
    /// thread only after [`Appender::start`].
    pub fn new(
        name: impl Into<String>,
        wrapped: Arc<dyn Appender>,
        settings: &AsyncSettings,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let name = name.into();
        if settings.queue_capacity == 0 {
            return Err(LoggerError::config(
                "AsyncAppender",
                "queue capacity must be at least 1",
            ));
        }
        if settings.discarding_threshold > settings.queue_capacity {
            return Err(LoggerError::config(
                "AsyncAppender",
                format!(
                    "discarding threshold {} exceeds queue capacity {}",
                    settings.discarding_threshold, settings.queue_capacity
                ),
            ));
        }

        let (sender, receiver) = bounded(settings.queue_capacity);
        Ok(Self {
            name,
            wrapped,
            capacity: settings.queue_capacity,
            discarding_threshold: settings.discarding_threshold,
            discard_floor: settings.discard_floor,
            shutdown_timeout: settings.shutdown_timeout,
            sender: RwLock::new(Some(sender)),
            receiver,
            handle: Mutex::new(None),
            abandoned: Arc::new(AtomicBool::new(false)),
            lifecycle: Lifecycle::new(),
            metrics: Arc::new(AppenderMetrics::new()),
            diagnostics,
        })
    }

    pub fn wrapped(&self) -> &Arc<dyn Appender> {
        &self.wrapped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events currently waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.receiver.len()
    }

    /// Apply the discard policy and enqueue without blocking
    fn offer(&self, event: &LogEvent) -> Result<()> {
        let guard = self.sender.read();
        let sender = guard
            .as_ref()
            .ok_or_else(|| LoggerError::not_started(&self.name))?;

        let len = sender.len();
        if len >= self.discarding_threshold && event.level() < self.discard_floor {
            return Err(LoggerError::queue_overflow(&self.name, len, self.capacity));
        }

        match sender.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(LoggerError::queue_overflow(&self.name, self.capacity, self.capacity))
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::not_started(&self.name)),
        }
    }

    /// Discard whatever is still queued, returning how many events were lost
    fn discard_remaining(&self) -> u64 {
        let mut discarded = 0u64;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

impl Appender for AsyncAppender {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn start(&self) -> Result<()> {
        match self.lifecycle.state() {
            LifecycleState::Started => return Ok(()),
            LifecycleState::Stopped => {
                return Err(LoggerError::config(
                    "AsyncAppender",
                    format!("appender '{}' was stopped and cannot be restarted", self.name),
                ))
            }
            LifecycleState::Created => {}
        }

        let receiver = self.receiver.clone();
        let wrapped = Arc::clone(&self.wrapped);
        let abandoned = Arc::clone(&self.abandoned);
        let metrics = Arc::clone(&self.metrics);

        let handle = thread::Builder::new()
            .name(format!("async-appender-{}", self.name))
            .spawn(move || {
                // Ends once the queue is closed and empty
                for event in receiver.iter() {
                    if abandoned.load(Ordering::Acquire) {
                        metrics.record_discarded_on_shutdown(1);
                        continue;
                    }
                    wrapped.deliver(&event);
                }
            })
            .map_err(|e| {
                LoggerError::io_operation(
                    "spawn async consumer",
                    format!("Failed to start consumer thread for '{}'", self.name),
                    e,
                )
            })?;

        *self.handle.lock() = Some(handle);
        self.lifecycle.mark_started();
        Ok(())
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        if !self.lifecycle.is_started() {
            return Err(LoggerError::not_started(&self.name));
        }
        self.offer(event)
    }

    /// Flushes the wrapped appender; queued events are not waited for
    fn flush(&self) -> Result<()> {
        self.wrapped.flush()
    }

    /// Close the queue and give the consumer `shutdown_timeout` to drain
    /// it. The wrapped appender is left running.
    fn stop(&self) -> Result<()> {
        if !self.lifecycle.mark_stopped() {
            return Ok(());
        }

        // Dropping the only sender closes the queue
        drop(self.sender.write().take());

        let handle = self.handle.lock().take();
        let drained = match handle {
            Some(handle) => {
                let deadline = Instant::now() + self.shutdown_timeout;
                while !handle.is_finished() && Instant::now() < deadline {
                    thread::sleep(SHUTDOWN_POLL_INTERVAL);
                }
                if handle.is_finished() {
                    if handle.join().is_err() {
                        self.diagnostics.report(Diagnostic::WriteFailure {
                            appender: self.name.clone(),
                            error: "consumer thread panicked".to_string(),
                        });
                    }
                    true
                } else {
                    // Leave the consumer behind; it stops forwarding
                    self.abandoned.store(true, Ordering::Release);
                    false
                }
            }
            None => false,
        };

        if !drained {
            let discarded = self.discard_remaining();
            if discarded > 0 {
                self.metrics.record_discarded_on_shutdown(discarded);
                self.diagnostics.report(Diagnostic::ShutdownDiscard {
                    appender: self.name.clone(),
                    discarded,
                });
            }
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

impl Drop for AsyncAppender {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
