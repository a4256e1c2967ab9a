//! Immutable appender and logger descriptors
//!
//! Descriptors are produced only by validating factory functions (or
//! deserialized from JSON through the same validation), so every
//! `AppenderConfig` the registry receives is already known to be usable.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use crate::appenders::RolloverPattern;
use crate::encoder::PatternEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable that forces immediate flush on every rolling file
pub const IMMEDIATE_FLUSH_ENV: &str = "LOG_IMMEDIATE_FLUSH";

/// Default async queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default time the async consumer gets to drain on stop
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of rolled files to keep
pub const DEFAULT_MAX_HISTORY: usize = 30;

/// Read [`IMMEDIATE_FLUSH_ENV`]. Only an explicit `true`/`1`/`yes` turns it on.
pub fn immediate_flush_from_env() -> bool {
    std::env::var(IMMEDIATE_FLUSH_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Combine the environment override with a per-appender flag.
///
/// The environment can only switch immediate flush on.
#[inline]
pub fn resolve_immediate_flush(env_override: bool, configured: bool) -> bool {
    env_override || configured
}

/// A byte count written the way operators write it: `"10MB"`, `"512KB"`,
/// `"1GB"` or a plain number of bytes. Units are binary (1KB = 1024 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    const KB: u64 = 1024;
    const MB: u64 = Self::KB * 1024;
    const GB: u64 = Self::MB * 1024;

    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Parse a size string. Units are case-insensitive and may be separated
    /// from the number by whitespace.
    ///
    /// ```
    /// use rust_appender_system::FileSize;
    ///
    /// assert_eq!(FileSize::parse("10MB").unwrap().bytes(), 10 * 1024 * 1024);
    /// assert_eq!(FileSize::parse("512 kb").unwrap().bytes(), 512 * 1024);
    /// assert_eq!(FileSize::parse("4096").unwrap().bytes(), 4096);
    /// assert!(FileSize::parse("ten megabytes").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (digits, unit) = text.split_at(split);

        let value: u64 = digits
            .parse()
            .map_err(|_| LoggerError::config("FileSize", format!("invalid size '{}'", text)))?;

        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" | "KB" => Self::KB,
            "M" | "MB" => Self::MB,
            "G" | "GB" => Self::GB,
            other => {
                return Err(LoggerError::config(
                    "FileSize",
                    format!("unknown size unit '{}' in '{}'", other, text),
                ))
            }
        };

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| LoggerError::config("FileSize", format!("size '{}' overflows", text)))?;
        if bytes == 0 {
            return Err(LoggerError::config("FileSize", "size must be greater than zero"));
        }
        Ok(Self(bytes))
    }
}

impl FromStr for FileSize {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        if bytes % Self::GB == 0 {
            write!(f, "{}GB", bytes / Self::GB)
        } else if bytes % Self::MB == 0 {
            write!(f, "{}MB", bytes / Self::MB)
        } else if bytes % Self::KB == 0 {
            write!(f, "{}KB", bytes / Self::KB)
        } else {
            write!(f, "{}", bytes)
        }
    }
}

/// Stream a console appender writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// File settings of a rolling file appender
#[derive(Debug, Clone, PartialEq)]
pub struct RollingFileSettings {
    /// Active log file
    pub file: PathBuf,

    /// Rolled file name, e.g. `logs/app-%d{%Y-%m-%d}.%i.log.gz`
    pub rollover_pattern: String,

    /// Size trigger; `None` rolls on the date period only
    pub max_file_size: Option<FileSize>,

    /// Rolled files to keep; `0` keeps all of them
    pub max_history: usize,

    /// Keep existing content on start instead of truncating
    pub append: bool,

    pub immediate_flush: bool,
}

impl RollingFileSettings {
    pub fn new(file: impl Into<PathBuf>, rollover_pattern: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            rollover_pattern: rollover_pattern.into(),
            max_file_size: None,
            max_history: DEFAULT_MAX_HISTORY,
            append: true,
            immediate_flush: false,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_size(mut self, size: FileSize) -> Self {
        self.max_file_size = Some(size);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_immediate_flush(mut self, immediate_flush: bool) -> Self {
        self.immediate_flush = immediate_flush;
        self
    }
}

/// Queue settings of an async appender
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncSettings {
    /// Name of the wrapped appender; must already be registered
    pub appender_ref: String,

    /// Queue capacity C
    pub queue_capacity: usize,

    /// Occupancy D from which only events at or above `discard_floor` are queued
    pub discarding_threshold: usize,

    pub discard_floor: LogLevel,

    /// Time the consumer gets to drain the queue on stop
    pub shutdown_timeout: Duration,
}

impl AsyncSettings {
    /// Defaults: capacity 256, priority discarding once four fifths of the
    /// queue is occupied, `WARN` floor, 5 second drain.
    pub fn new(appender_ref: impl Into<String>) -> Self {
        Self {
            appender_ref: appender_ref.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            discarding_threshold: default_threshold(DEFAULT_QUEUE_CAPACITY),
            discard_floor: LogLevel::Warn,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity and reset the threshold to its default for it
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self.discarding_threshold = default_threshold(capacity);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_discarding_threshold(mut self, threshold: usize) -> Self {
        self.discarding_threshold = threshold;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_discard_floor(mut self, level: LogLevel) -> Self {
        self.discard_floor = level;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

fn default_threshold(capacity: usize) -> usize {
    capacity - capacity / 5
}

/// Variant-specific part of an [`AppenderConfig`]
#[derive(Debug, Clone, PartialEq)]
pub enum AppenderKind {
    Console {
        encoder: PatternEncoder,
        target: ConsoleTarget,
    },
    RollingFile {
        encoder: PatternEncoder,
        settings: RollingFileSettings,
    },
    Async(AsyncSettings),
}

/// Validated, immutable appender descriptor
///
/// ```
/// use rust_appender_system::{AppenderConfig, AsyncSettings};
///
/// let console = AppenderConfig::console("CONSOLE", "%-5level %msg%n").unwrap();
/// assert_eq!(console.name(), "CONSOLE");
///
/// // threshold above capacity
/// let settings = AsyncSettings::new("CONSOLE")
///     .with_queue_capacity(10)
///     .with_discarding_threshold(11);
/// assert!(AppenderConfig::async_wrapper("ASYNC", settings).is_err());
///
/// assert!(AppenderConfig::console("BAD", "%nope").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "AppenderDescriptor")]
pub struct AppenderConfig {
    name: String,
    kind: AppenderKind,
}

impl AppenderConfig {
    /// Console appender writing to stdout
    pub fn console(name: impl Into<String>, pattern: &str) -> Result<Self> {
        Self::console_to(name, pattern, ConsoleTarget::Stdout)
    }

    pub fn console_to(name: impl Into<String>, pattern: &str, target: ConsoleTarget) -> Result<Self> {
        let name = validate_name(name.into())?;
        let encoder = PatternEncoder::new(pattern)?;
        Ok(Self {
            name,
            kind: AppenderKind::Console { encoder, target },
        })
    }

    pub fn rolling_file(
        name: impl Into<String>,
        pattern: &str,
        settings: RollingFileSettings,
    ) -> Result<Self> {
        let name = validate_name(name.into())?;
        let encoder = PatternEncoder::new(pattern)?;

        if settings.file.as_os_str().is_empty() {
            return Err(LoggerError::config(
                "RollingFileAppender",
                format!("appender '{}' has an empty file path", name),
            ));
        }
        let rollover = RolloverPattern::parse(&settings.rollover_pattern)?;
        rollover.check_triggers(settings.max_file_size.is_some())?;

        Ok(Self {
            name,
            kind: AppenderKind::RollingFile { encoder, settings },
        })
    }

    pub fn async_wrapper(name: impl Into<String>, settings: AsyncSettings) -> Result<Self> {
        let name = validate_name(name.into())?;

        if settings.appender_ref.trim().is_empty() {
            return Err(LoggerError::config(
                "AsyncAppender",
                format!("appender '{}' does not name a wrapped appender", name),
            ));
        }
        if settings.appender_ref == name {
            return Err(LoggerError::config(
                "AsyncAppender",
                format!("appender '{}' cannot wrap itself", name),
            ));
        }
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

        Ok(Self {
            name,
            kind: AppenderKind::Async(settings),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AppenderKind {
        &self.kind
    }
}

fn validate_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        return Err(LoggerError::config("AppenderConfig", "appender name must not be empty"));
    }
    Ok(name)
}

/// Serialized form of [`AppenderConfig`]; only reachable through `TryFrom`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AppenderDescriptor {
    Console {
        name: String,
        #[serde(default)]
        pattern: Option<String>,
        #[serde(default)]
        target: ConsoleTarget,
    },
    RollingFile {
        name: String,
        #[serde(default)]
        pattern: Option<String>,
        file: PathBuf,
        rollover_pattern: String,
        #[serde(default)]
        max_file_size: Option<String>,
        #[serde(default)]
        max_history: Option<usize>,
        #[serde(default)]
        append: Option<bool>,
        #[serde(default)]
        immediate_flush: Option<bool>,
    },
    Async {
        name: String,
        appender_ref: String,
        #[serde(default)]
        queue_capacity: Option<usize>,
        #[serde(default)]
        discarding_threshold: Option<usize>,
        #[serde(default)]
        discard_floor: Option<LogLevel>,
        #[serde(default)]
        shutdown_timeout_ms: Option<u64>,
    },
}

impl TryFrom<AppenderDescriptor> for AppenderConfig {
    type Error = LoggerError;

    fn try_from(descriptor: AppenderDescriptor) -> Result<Self> {
        use crate::encoder::DEFAULT_PATTERN;

        match descriptor {
            AppenderDescriptor::Console {
                name,
                pattern,
                target,
            } => Self::console_to(name, pattern.as_deref().unwrap_or(DEFAULT_PATTERN), target),
            AppenderDescriptor::RollingFile {
                name,
                pattern,
                file,
                rollover_pattern,
                max_file_size,
                max_history,
                append,
                immediate_flush,
            } => {
                let mut settings = RollingFileSettings::new(file, rollover_pattern);
                if let Some(size) = max_file_size {
                    settings.max_file_size = Some(FileSize::parse(&size)?);
                }
                if let Some(max_history) = max_history {
                    settings.max_history = max_history;
                }
                if let Some(append) = append {
                    settings.append = append;
                }
                if let Some(immediate_flush) = immediate_flush {
                    settings.immediate_flush = immediate_flush;
                }
                Self::rolling_file(name, pattern.as_deref().unwrap_or(DEFAULT_PATTERN), settings)
            }
            AppenderDescriptor::Async {
                name,
                appender_ref,
                queue_capacity,
                discarding_threshold,
                discard_floor,
                shutdown_timeout_ms,
            } => {
                let mut settings = AsyncSettings::new(appender_ref);
                if let Some(capacity) = queue_capacity {
                    settings = settings.with_queue_capacity(capacity);
                }
                if let Some(threshold) = discarding_threshold {
                    settings.discarding_threshold = threshold;
                }
                if let Some(floor) = discard_floor {
                    settings.discard_floor = floor;
                }
                if let Some(ms) = shutdown_timeout_ms {
                    settings.shutdown_timeout = Duration::from_millis(ms);
                }
                Self::async_wrapper(name, settings)
            }
        }
    }
}

/// Logger descriptor: the same level, additivity and appenders applied to
/// one or more logger names
///
/// ```
/// use rust_appender_system::{LoggerConfig, LogLevel};
///
/// let config = LoggerConfig::new(["com.example.db", "com.example.cache"])
///     .level(LogLevel::Warn)
///     .additive(false)
///     .appender("DB_FILE");
///
/// assert_eq!(config.names().len(), 2);
/// assert_eq!(config.appenders(), ["DB_FILE"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    names: Vec<String>,
    #[serde(default)]
    level: Option<LogLevel>,
    #[serde(default = "default_additive")]
    additive: bool,
    #[serde(default)]
    appenders: Vec<String>,
}

fn default_additive() -> bool {
    true
}

impl LoggerConfig {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            level: None,
            additive: true,
            appenders: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn appender(mut self, name: impl Into<String>) -> Self {
        self.appenders.push(name.into());
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn level_setting(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn is_additive(&self) -> bool {
        self.additive
    }

    pub fn appenders(&self) -> &[String] {
        &self.appenders
    }
}

/// A complete registry layout: appenders in creation order, then loggers
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub appenders: Vec<AppenderConfig>,
    #[serde(default)]
    pub loggers: Vec<LoggerConfig>,
}

impl RegistryConfig {
    /// Parse and validate a JSON layout
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size_parse() {
        assert_eq!(FileSize::parse("1GB").unwrap().bytes(), 1024 * 1024 * 1024);
        assert_eq!(FileSize::parse("10mb").unwrap().bytes(), 10 * 1024 * 1024);
        assert_eq!(FileSize::parse("2K").unwrap().bytes(), 2048);
        assert_eq!(FileSize::parse(" 100 ").unwrap().bytes(), 100);
        assert!(FileSize::parse("").is_err());
        assert!(FileSize::parse("0").is_err());
        assert!(FileSize::parse("10TB").is_err());
        assert!(FileSize::parse("MB").is_err());
    }

    #[test]
    fn test_file_size_display() {
        assert_eq!(FileSize::parse("10MB").unwrap().to_string(), "10MB");
        assert_eq!(FileSize::from_bytes(1536).to_string(), "1536");
        assert_eq!(FileSize::from_bytes(2048).to_string(), "2KB");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("on"));
    }

    #[test]
    fn test_immediate_flush_precedence() {
        assert!(resolve_immediate_flush(true, false));
        assert!(resolve_immediate_flush(true, true));
        assert!(resolve_immediate_flush(false, true));
        assert!(!resolve_immediate_flush(false, false));
    }

    #[test]
    fn test_async_threshold_bounds() {
        let equal = AsyncSettings::new("FILE")
            .with_queue_capacity(10)
            .with_discarding_threshold(10);
        assert!(AppenderConfig::async_wrapper("ASYNC", equal).is_ok());

        let zero = AsyncSettings::new("FILE").with_queue_capacity(0);
        assert!(AppenderConfig::async_wrapper("ASYNC", zero).is_err());

        let itself = AsyncSettings::new("ASYNC");
        assert!(AppenderConfig::async_wrapper("ASYNC", itself).is_err());
    }

    #[test]
    fn test_default_threshold() {
        let settings = AsyncSettings::new("FILE");
        assert_eq!(settings.queue_capacity, 256);
        assert_eq!(settings.discarding_threshold, 205);
        assert_eq!(settings.with_queue_capacity(10).discarding_threshold, 8);
    }

    #[test]
    fn test_rolling_file_validation() {
        let sized = RollingFileSettings::new("app.log", "app-%d.%i.log")
            .with_max_file_size(FileSize::parse("1MB").unwrap());
        assert!(AppenderConfig::rolling_file("FILE", "%msg%n", sized).is_ok());

        // size trigger without %i
        let no_index = RollingFileSettings::new("app.log", "app-%d.log")
            .with_max_file_size(FileSize::parse("1MB").unwrap());
        assert!(AppenderConfig::rolling_file("FILE", "%msg%n", no_index).is_err());

        // time only without %d
        let no_date = RollingFileSettings::new("app.log", "app.%i.log");
        assert!(AppenderConfig::rolling_file("FILE", "%msg%n", no_date).is_err());

        let empty_path = RollingFileSettings::new("", "app-%d.log");
        assert!(AppenderConfig::rolling_file("FILE", "%msg%n", empty_path).is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(AppenderConfig::console("  ", "%msg").is_err());
    }

    #[test]
    fn test_registry_config_from_json() {
        let json = r#"{
            "appenders": [
                { "kind": "console", "name": "CONSOLE", "pattern": "%level %msg%n", "target": "stderr" },
                { "kind": "rolling_file", "name": "FILE", "file": "logs/app.log",
                  "rollover_pattern": "logs/app-%d.%i.log.gz", "max_file_size": "10MB",
                  "max_history": 7 },
                { "kind": "async", "name": "ASYNC", "appender_ref": "FILE",
                  "queue_capacity": 10, "discarding_threshold": 5, "discard_floor": "warning" }
            ],
            "loggers": [
                { "names": ["ROOT"], "level": "INFO", "appenders": ["CONSOLE"] },
                { "names": ["com.example"], "additive": false, "appenders": ["ASYNC"] }
            ]
        }"#;

        let config = RegistryConfig::from_json(json).unwrap();
        assert_eq!(config.appenders.len(), 3);
        match config.appenders[0].kind() {
            AppenderKind::Console { target, .. } => assert_eq!(*target, ConsoleTarget::Stderr),
            other => panic!("unexpected kind {:?}", other),
        }
        match config.appenders[1].kind() {
            AppenderKind::RollingFile { settings, .. } => {
                assert_eq!(settings.max_file_size, Some(FileSize::from_bytes(10 * 1024 * 1024)));
                assert_eq!(settings.max_history, 7);
                assert!(settings.append);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        match config.appenders[2].kind() {
            AppenderKind::Async(settings) => {
                assert_eq!(settings.discarding_threshold, 5);
                assert_eq!(settings.discard_floor, LogLevel::Warn);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(config.loggers[0].is_additive());
        assert!(!config.loggers[1].is_additive());
    }

    #[test]
    fn test_json_validation_errors_surface() {
        let json = r#"{ "appenders": [ { "kind": "console", "name": "C", "pattern": "%bogus" } ] }"#;
        let err = RegistryConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
