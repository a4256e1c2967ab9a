//! Error types for the appender system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// An appender with this name is already registered
    #[error("Appender '{name}' is already registered")]
    DuplicateName { name: String },

    /// Attach or wrap referenced an appender that is not registered
    #[error("Unknown appender '{name}'")]
    UnknownAppender { name: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Writing a formatted event to the underlying sink failed
    #[error("Write failure in appender '{appender}': {message}")]
    WriteFailure { appender: String, message: String },

    /// Event dropped by the async discard policy
    #[error("Queue overflow in appender '{appender}': {queued}/{capacity} events queued")]
    QueueOverflow {
        appender: String,
        queued: usize,
        capacity: usize,
    },

    /// Registry already stopped
    #[error("Registry already stopped")]
    RegistryStopped,

    /// Appender is not in the started state
    #[error("Appender '{name}' is not started")]
    AppenderNotStarted { name: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLock { path: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON descriptor error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoggerError {
    /// Create a duplicate appender name error
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        LoggerError::DuplicateName { name: name.into() }
    }

    /// Create an unknown appender error
    pub fn unknown_appender(name: impl Into<String>) -> Self {
        LoggerError::UnknownAppender { name: name.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a write failure error
    pub fn write_failure(appender: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::WriteFailure {
            appender: appender.into(),
            message: message.into(),
        }
    }

    pub fn queue_overflow(appender: impl Into<String>, queued: usize, capacity: usize) -> Self {
        LoggerError::QueueOverflow {
            appender: appender.into(),
            queued,
            capacity,
        }
    }

    pub fn not_started(name: impl Into<String>) -> Self {
        LoggerError::AppenderNotStarted { name: name.into() }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLock { path: path.into() }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Whether this error is an expected outcome of the discard policy
    /// rather than a failure
    pub fn is_overflow(&self) -> bool {
        matches!(self, LoggerError::QueueOverflow { .. })
    }
}
