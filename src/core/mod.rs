//! Core types: events, levels, descriptors, errors and the appender trait

pub mod appender;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod log_context;
pub mod log_event;
pub mod log_level;
pub mod metrics;
pub mod timestamp;

pub use appender::{Appender, Lifecycle, LifecycleState};
pub use config::{
    immediate_flush_from_env, resolve_immediate_flush, AppenderConfig, AppenderKind,
    AsyncSettings, ConsoleTarget, FileSize, LoggerConfig, RegistryConfig, RollingFileSettings,
    DEFAULT_MAX_HISTORY, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT, IMMEDIATE_FLUSH_ENV,
};
pub use diagnostics::{Diagnostic, DiagnosticCallback, Diagnostics};
pub use error::{LoggerError, Result};
pub use log_context::{FieldValue, LogContext};
pub use log_event::LogEvent;
pub use log_level::LogLevel;
pub use metrics::AppenderMetrics;
pub use timestamp::TimestampFormat;
