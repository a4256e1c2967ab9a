//! Appender implementations

pub mod async_appender;
pub mod console;
pub mod rolling_file;
pub mod rolling_policy;

pub use async_appender::AsyncAppender;
pub use console::ConsoleAppender;
pub use rolling_file::RollingFileAppender;
pub use rolling_policy::RolloverPattern;

pub use crate::core::Appender;
