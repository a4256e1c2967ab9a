//! Appender registry and logger routing
//!
//! The registry owns every named appender and the bindings of loggers to
//! them. Mutations are serialized by one writer lock and publish a fresh
//! immutable snapshot; delivery clones the current snapshot and routes
//! against it, so it never sees a half-applied change.

mod binding;

pub use binding::{parent_logger, LoggerBinding, DEFAULT_ROOT_LEVEL, ROOT_LOGGER};

use crate::appenders::{AsyncAppender, ConsoleAppender, RollingFileAppender};
use crate::core::{
    immediate_flush_from_env, resolve_immediate_flush, Appender, AppenderConfig, AppenderKind,
    Diagnostic, Diagnostics, LogEvent, LogLevel, LoggerConfig, LoggerError, RegistryConfig,
    Result,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
struct RegistryState {
    appenders: HashMap<String, Arc<dyn Appender>>,
    /// Appender names in creation order
    order: Vec<String>,
    bindings: HashMap<String, LoggerBinding>,
}

impl RegistryState {
    fn effective_level(&self, logger: &str) -> LogLevel {
        let mut name = Some(logger);
        while let Some(current) = name {
            if let Some(level) = self.bindings.get(current).and_then(LoggerBinding::level) {
                return level;
            }
            name = parent_logger(current);
        }
        DEFAULT_ROOT_LEVEL
    }

    /// Appenders an event for `logger` reaches: its own, then its
    /// ancestors' until a non-additive binding
    fn route(&self, logger: &str) -> Vec<Arc<dyn Appender>> {
        let mut targets = Vec::new();
        let mut name = Some(logger);
        while let Some(current) = name {
            if let Some(binding) = self.bindings.get(current) {
                targets.extend(
                    binding
                        .appenders()
                        .iter()
                        .filter_map(|appender| self.appenders.get(appender).cloned()),
                );
                if !binding.is_additive() {
                    break;
                }
            }
            name = parent_logger(current);
        }
        targets
    }
}

/// Outcome of [`Registry::stop_all`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    /// Appenders stopped, in stop order
    pub stopped: Vec<String>,

    /// Appenders whose stop failed, with the error text
    pub failures: Vec<(String, String)>,

    /// Events still queued in async appenders when their drain timed out
    pub discarded: u64,
}

impl ShutdownReport {
    /// No stop failures and nothing discarded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.discarded == 0
    }
}

/// Builder for [`Registry`]
///
/// # Example
///
/// ```
/// use rust_appender_system::{Diagnostics, Registry};
///
/// let registry = Registry::builder()
///     .diagnostics(Diagnostics::silent())
///     .immediate_flush_override(false)
///     .build();
/// assert!(!registry.is_stopped());
/// ```
pub struct RegistryBuilder {
    diagnostics: Diagnostics,
    immediate_flush_override: Option<bool>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            diagnostics: Diagnostics::default(),
            immediate_flush_override: None,
        }
    }

    /// Diagnostic channel shared by the registry and every appender it
    /// creates
    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Fix the immediate flush override instead of reading
    /// `LOG_IMMEDIATE_FLUSH`
    #[must_use = "builder methods return a new value"]
    pub fn immediate_flush_override(mut self, enabled: bool) -> Self {
        self.immediate_flush_override = Some(enabled);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            state: RwLock::new(Arc::new(RegistryState::default())),
            write_lock: Mutex::new(()),
            stopped: AtomicBool::new(false),
            diagnostics: self.diagnostics,
            immediate_flush_override: self
                .immediate_flush_override
                .unwrap_or_else(immediate_flush_from_env),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Named appenders, logger bindings and event routing
///
/// # Example
///
/// ```
/// use rust_appender_system::{AppenderConfig, Diagnostics, LogLevel, Registry};
///
/// let registry = Registry::builder().diagnostics(Diagnostics::silent()).build();
/// registry
///     .create_appender(AppenderConfig::console("CONSOLE", "%-5level %logger - %msg%n").unwrap())
///     .unwrap();
/// registry.attach("ROOT", "CONSOLE").unwrap();
///
/// registry.log("com.example", LogLevel::Info, "started");
/// let report = registry.stop_all().unwrap();
/// assert_eq!(report.stopped, ["CONSOLE"]);
/// ```
pub struct Registry {
    state: RwLock<Arc<RegistryState>>,
    write_lock: Mutex<()>,
    stopped: AtomicBool,
    diagnostics: Diagnostics,
    immediate_flush_override: bool,
}

impl Registry {
    /// Registry reporting diagnostics to stderr, with the immediate flush
    /// override taken from the environment
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state.read())
    }

    fn publish(&self, state: RegistryState) {
        *self.state.write() = Arc::new(state);
    }

    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(LoggerError::RegistryStopped);
        }
        Ok(())
    }

    /// Build, start and register an appender from its descriptor.
    ///
    /// An async descriptor wraps an appender that must already be
    /// registered.
    pub fn create_appender(&self, config: AppenderConfig) -> Result<Arc<dyn Appender>> {
        let _writer = self.write_lock.lock();
        self.ensure_running()?;

        let mut state = RegistryState::clone(&self.snapshot());
        if state.appenders.contains_key(config.name()) {
            return Err(LoggerError::duplicate_name(config.name()));
        }

        let appender = self.build_appender(&config, &state)?;
        appender.start()?;

        state
            .appenders
            .insert(config.name().to_string(), Arc::clone(&appender));
        state.order.push(config.name().to_string());
        self.publish(state);
        Ok(appender)
    }

    fn build_appender(
        &self,
        config: &AppenderConfig,
        state: &RegistryState,
    ) -> Result<Arc<dyn Appender>> {
        let diagnostics = self.diagnostics.clone();
        let appender: Arc<dyn Appender> = match config.kind() {
            AppenderKind::Console { encoder, target } => Arc::new(ConsoleAppender::new(
                config.name(),
                encoder.clone(),
                *target,
                diagnostics,
            )),
            AppenderKind::RollingFile { encoder, settings } => {
                let mut settings = settings.clone();
                settings.immediate_flush =
                    resolve_immediate_flush(self.immediate_flush_override, settings.immediate_flush);
                Arc::new(RollingFileAppender::new(
                    config.name(),
                    encoder.clone(),
                    &settings,
                    diagnostics,
                )?)
            }
            AppenderKind::Async(settings) => {
                let wrapped = state
                    .appenders
                    .get(&settings.appender_ref)
                    .cloned()
                    .ok_or_else(|| LoggerError::unknown_appender(&settings.appender_ref))?;
                Arc::new(AsyncAppender::new(config.name(), wrapped, settings, diagnostics)?)
            }
        };
        Ok(appender)
    }

    /// Create every appender in order, then apply every logger descriptor
    pub fn configure(&self, config: &RegistryConfig) -> Result<()> {
        for appender in &config.appenders {
            self.create_appender(appender.clone())?;
        }
        for logger in &config.loggers {
            self.add_logger(logger)?;
        }
        Ok(())
    }

    pub fn appender(&self, name: &str) -> Option<Arc<dyn Appender>> {
        self.snapshot().appenders.get(name).cloned()
    }

    /// Registered appender names in creation order
    pub fn appender_names(&self) -> Vec<String> {
        self.snapshot().order.clone()
    }

    pub fn binding(&self, logger: &str) -> Option<LoggerBinding> {
        self.snapshot().bindings.get(logger).cloned()
    }

    /// Apply `change` to the binding of `logger` (created on demand) and
    /// publish the result if `change` reports a modification
    fn mutate_binding<T>(
        &self,
        logger: &str,
        change: impl FnOnce(&mut LoggerBinding) -> (T, bool),
    ) -> T {
        let _writer = self.write_lock.lock();
        let mut state = RegistryState::clone(&self.snapshot());
        let binding = state
            .bindings
            .entry(logger.to_string())
            .or_insert_with(|| LoggerBinding::new(logger));
        let (result, changed) = change(binding);
        if changed {
            self.publish(state);
        }
        result
    }

    /// Attach a registered appender to a logger. Attaching twice is a no-op.
    pub fn attach(&self, logger: &str, appender: &str) -> Result<()> {
        let _writer = self.write_lock.lock();
        let mut state = RegistryState::clone(&self.snapshot());
        if !state.appenders.contains_key(appender) {
            return Err(LoggerError::unknown_appender(appender));
        }
        let binding = state
            .bindings
            .entry(logger.to_string())
            .or_insert_with(|| LoggerBinding::new(logger));
        if binding.attach(appender) {
            self.publish(state);
        }
        Ok(())
    }

    /// Detach an appender from a logger, returning whether it was attached.
    /// The appender itself keeps running.
    pub fn detach(&self, logger: &str, appender: &str) -> bool {
        let _writer = self.write_lock.lock();
        let mut state = RegistryState::clone(&self.snapshot());
        let detached = state
            .bindings
            .get_mut(logger)
            .is_some_and(|binding| binding.detach(appender));
        if detached {
            self.publish(state);
        }
        detached
    }

    /// Set or clear (inherit) the level of a logger
    pub fn set_level(&self, logger: &str, level: Option<LogLevel>) {
        self.mutate_binding(logger, |binding| {
            let changed = binding.level() != level;
            binding.set_level(level);
            ((), changed)
        })
    }

    pub fn set_additivity(&self, logger: &str, additive: bool) {
        self.mutate_binding(logger, |binding| {
            let changed = binding.is_additive() != additive;
            binding.set_additive(additive);
            ((), changed)
        })
    }

    /// Apply a logger descriptor to every logger it names, as one change.
    /// Nothing is applied if any appender name is unknown.
    pub fn add_logger(&self, config: &LoggerConfig) -> Result<()> {
        let _writer = self.write_lock.lock();
        let mut state = RegistryState::clone(&self.snapshot());

        if let Some(unknown) = config
            .appenders()
            .iter()
            .find(|name| !state.appenders.contains_key(name.as_str()))
        {
            return Err(LoggerError::unknown_appender(unknown));
        }

        for name in config.names() {
            let binding = state
                .bindings
                .entry(name.clone())
                .or_insert_with(|| LoggerBinding::new(name.as_str()));
            if let Some(level) = config.level_setting() {
                binding.set_level(Some(level));
            }
            binding.set_additive(config.is_additive());
            for appender in config.appenders() {
                binding.attach(appender);
            }
        }
        self.publish(state);
        Ok(())
    }

    /// Level a logger logs at, inherited from the nearest ancestor with one
    pub fn effective_level(&self, logger: &str) -> LogLevel {
        self.snapshot().effective_level(logger)
    }

    pub fn is_enabled(&self, logger: &str, level: LogLevel) -> bool {
        level >= self.effective_level(logger)
    }

    /// Log a message. Failures are never returned; they surface through
    /// appender metrics and the diagnostic channel.
    pub fn log(&self, logger: &str, level: LogLevel, message: impl AsRef<str>) {
        if self.stopped.load(Ordering::Acquire) {
            self.report_stopped(logger);
            return;
        }
        let snapshot = self.snapshot();
        if level < snapshot.effective_level(logger) {
            return;
        }
        let event = LogEvent::new(logger, level, message);
        for appender in snapshot.route(logger) {
            appender.deliver(&event);
        }
    }

    /// Route a prepared event by its logger name
    pub fn log_event(&self, event: &LogEvent) {
        if self.stopped.load(Ordering::Acquire) {
            self.report_stopped(event.logger());
            return;
        }
        let snapshot = self.snapshot();
        if event.level() < snapshot.effective_level(event.logger()) {
            return;
        }
        for appender in snapshot.route(event.logger()) {
            appender.deliver(event);
        }
    }

    fn report_stopped(&self, logger: &str) {
        self.diagnostics.report(Diagnostic::RegistryStopped {
            logger: logger.to_string(),
        });
    }

    /// Flush every appender, returning the first error
    pub fn flush_all(&self) -> Result<()> {
        let snapshot = self.snapshot();
        let mut first_error = None;
        for name in &snapshot.order {
            if let Some(appender) = snapshot.appenders.get(name) {
                if let Err(e) = appender.flush() {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Start every registered appender in creation order. Already started
    /// appenders are left alone.
    pub fn start_all(&self) -> Result<()> {
        self.ensure_running()?;
        let snapshot = self.snapshot();
        let mut first_error = None;
        for name in &snapshot.order {
            if let Some(appender) = snapshot.appenders.get(name) {
                if let Err(e) = appender.start() {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stop every appender, newest first, so async wrappers drain into
    /// their targets before those stop. Only the first call does anything.
    pub fn stop_all(&self) -> Result<ShutdownReport> {
        let _writer = self.write_lock.lock();
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Err(LoggerError::RegistryStopped);
        }

        let snapshot = self.snapshot();
        let mut report = ShutdownReport::default();
        for name in snapshot.order.iter().rev() {
            let Some(appender) = snapshot.appenders.get(name) else {
                continue;
            };
            match appender.stop() {
                Ok(()) => report.stopped.push(name.clone()),
                Err(e) => report.failures.push((name.clone(), e.to_string())),
            }
            report.discarded += appender.metrics().discarded_on_shutdown();
        }
        Ok(report)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if !self.is_stopped() {
            let _ = self.stop_all();
        }
    }
}
