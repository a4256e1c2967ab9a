//! Logger bindings and the logger name hierarchy

use crate::core::LogLevel;

/// Name of the root logger
pub const ROOT_LOGGER: &str = "ROOT";

/// Level the root logger uses when none is set
pub const DEFAULT_ROOT_LEVEL: LogLevel = LogLevel::Debug;

/// Level, additivity and attached appenders of one named logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerBinding {
    name: String,
    level: Option<LogLevel>,
    additive: bool,
    appenders: Vec<String>,
}

impl LoggerBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            additive: true,
            appenders: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level set on this logger; `None` inherits
    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn is_additive(&self) -> bool {
        self.additive
    }

    /// Attached appender names in attachment order
    pub fn appenders(&self) -> &[String] {
        &self.appenders
    }

    pub fn is_attached(&self, appender: &str) -> bool {
        self.appenders.iter().any(|name| name == appender)
    }

    /// Returns false if the appender was already attached
    pub(crate) fn attach(&mut self, appender: &str) -> bool {
        if self.is_attached(appender) {
            return false;
        }
        self.appenders.push(appender.to_string());
        true
    }

    /// Returns false if the appender was not attached
    pub(crate) fn detach(&mut self, appender: &str) -> bool {
        let before = self.appenders.len();
        self.appenders.retain(|name| name != appender);
        self.appenders.len() != before
    }

    pub(crate) fn set_level(&mut self, level: Option<LogLevel>) {
        self.level = level;
    }

    pub(crate) fn set_additive(&mut self, additive: bool) {
        self.additive = additive;
    }
}

/// Parent in the dot-separated hierarchy: `a.b.c -> a.b -> a -> ROOT`
pub fn parent_logger(name: &str) -> Option<&str> {
    if name == ROOT_LOGGER {
        return None;
    }
    match name.rfind('.') {
        Some(pos) => Some(&name[..pos]),
        None => Some(ROOT_LOGGER),
    }
}
