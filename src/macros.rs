//! Logging macros for ergonomic log message formatting.
//!
//! The message is only formatted when the logger is enabled for the level.
//!
//! # Examples
//!
//! ```
//! use rust_appender_system::prelude::*;
//! use rust_appender_system::{info, warn};
//!
//! let registry = Registry::builder().diagnostics(Diagnostics::silent()).build();
//!
//! info!(registry, "com.example.Server", "Server started");
//!
//! let port = 8080;
//! warn!(registry, "com.example.Server", "Port {} already bound", port);
//! ```

/// Log a formatted message to a logger of a registry.
///
/// # Examples
///
/// ```
/// # use rust_appender_system::prelude::*;
/// # let registry = Registry::builder().diagnostics(Diagnostics::silent()).build();
/// use rust_appender_system::log;
/// log!(registry, "com.example", LogLevel::Info, "Simple message");
/// log!(registry, "com.example", LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($registry:expr, $logger:expr, $level:expr, $($arg:tt)+) => {{
        let registry = &$registry;
        let logger: &str = $logger;
        let level = $level;
        if registry.is_enabled(logger, level) {
            registry.log(logger, level, format!($($arg)+));
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($registry:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($registry, $logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($registry:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($registry, $logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_appender_system::prelude::*;
/// # let registry = Registry::builder().diagnostics(Diagnostics::silent()).build();
/// use rust_appender_system::info;
/// let user_id = 42;
/// info!(registry, "com.example.auth", "User {} logged in", user_id);
/// ```
#[macro_export]
macro_rules! info {
    ($registry:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($registry, $logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($registry:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($registry, $logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($registry:expr, $logger:expr, $($arg:tt)+) => {
        $crate::log!($registry, $logger, $crate::LogLevel::Error, $($arg)+)
    };
}
