//! # Rust Appender System
//!
//! Runtime appender management and delivery engine: pattern encoders,
//! console, rolling file and bounded async appenders, routed through a
//! registry of named, hierarchical loggers.
//!
//! ## Features
//!
//! - **Pattern layouts**: logback-style `%d %-5level %logger{36} - %msg%n`
//!   compiled once per appender
//! - **Rolling files**: size and date triggered rollover with retention and
//!   optional gzip
//! - **Async delivery**: bounded queue with level-aware discarding; producers
//!   never block
//! - **Runtime rebinding**: attach and detach appenders while logging
//!
//! ## Example
//!
//! ```
//! use rust_appender_system::prelude::*;
//! use rust_appender_system::info;
//!
//! let registry = Registry::builder().diagnostics(Diagnostics::silent()).build();
//! registry
//!     .create_appender(AppenderConfig::console("CONSOLE", "%-5level %logger{0} - %msg%n")?)?;
//! registry.attach(ROOT_LOGGER, "CONSOLE")?;
//!
//! info!(registry, "com.example.Server", "listening on port {}", 8080);
//! registry.stop_all()?;
//! # Ok::<(), LoggerError>(())
//! ```

pub mod appenders;
pub mod core;
pub mod encoder;
pub mod macros;
pub mod registry;

pub mod prelude {
    pub use crate::core::{
        Appender, AppenderConfig, AsyncSettings, ConsoleTarget, Diagnostic, Diagnostics,
        FileSize, LogContext, LogEvent, LogLevel, LoggerConfig, LoggerError, Result,
        RollingFileSettings,
    };
    pub use crate::encoder::PatternEncoder;
    pub use crate::registry::{Registry, ShutdownReport, ROOT_LOGGER};
}

pub use appenders::{AsyncAppender, ConsoleAppender, RollingFileAppender, RolloverPattern};
pub use core::{
    Appender, AppenderConfig, AppenderKind, AppenderMetrics, AsyncSettings, ConsoleTarget,
    Diagnostic, DiagnosticCallback, Diagnostics, FieldValue, FileSize, LifecycleState,
    LogContext, LogEvent, LogLevel, LoggerConfig, LoggerError, RegistryConfig, Result,
    RollingFileSettings, TimestampFormat,
};
pub use encoder::{PatternEncoder, DEFAULT_PATTERN};
pub use registry::{LoggerBinding, Registry, RegistryBuilder, ShutdownReport, ROOT_LOGGER};
