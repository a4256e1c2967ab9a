//! Rolling file appender with size and time triggered rollover
//!
//! The active file is opened on start under an advisory exclusive lock.
//! Every append checks the rollover triggers, rolls if needed and writes
//! the event, all under one lock, so a rollover can never split a record.

use super::rolling_policy::{Retention, RolloverPattern};
use crate::core::{
    Appender, AppenderMetrics, Diagnostic, Diagnostics, Lifecycle, LifecycleState, LogEvent,
    LoggerError, Result, RollingFileSettings,
};
use crate::encoder::PatternEncoder;
use chrono::{DateTime, Local};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

struct FileState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// When the active file's period began
    opened_at: DateTime<Local>,
    /// Period key of `opened_at`
    period: Option<String>,
    next_index: u32,
    retention: Retention,
    /// Gzip of the most recently rolled file, running off the write lock
    compression: Option<JoinHandle<()>>,
}

/// File appender that rolls the active file according to a
/// [`RolloverPattern`]
///
/// # Examples
///
/// ```no_run
/// use rust_appender_system::appenders::RollingFileAppender;
/// use rust_appender_system::{Appender, Diagnostics, FileSize, PatternEncoder, RollingFileSettings};
///
/// let settings = RollingFileSettings::new("logs/app.log", "logs/app-%d.%i.log.gz")
///     .with_max_file_size(FileSize::parse("10MB").unwrap())
///     .with_max_history(7);
/// let appender = RollingFileAppender::new(
///     "FILE",
///     PatternEncoder::default(),
///     &settings,
///     Diagnostics::stderr(),
/// )
/// .unwrap();
/// appender.start().unwrap();
/// ```
pub struct RollingFileAppender {
    name: String,
    path: PathBuf,
    encoder: PatternEncoder,
    rollover: RolloverPattern,
    max_file_size: Option<u64>,
    append: bool,
    immediate_flush: bool,
    state: Mutex<FileState>,
    lifecycle: Lifecycle,
    metrics: AppenderMetrics,
    diagnostics: Diagnostics,
}

impl RollingFileAppender {
    /// Create an appender. Nothing is opened until [`Appender::start`].
    ///
    /// `settings.immediate_flush` is used as given; callers combine it
    /// with the environment override beforehand.
    pub fn new(
        name: impl Into<String>,
        encoder: PatternEncoder,
        settings: &RollingFileSettings,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let rollover = RolloverPattern::parse(&settings.rollover_pattern)?;
        rollover.check_triggers(settings.max_file_size.is_some())?;

        let now = Local::now();
        Ok(Self {
            name: name.into(),
            path: settings.file.clone(),
            encoder,
            max_file_size: settings.max_file_size.map(|size| size.bytes()),
            append: settings.append,
            immediate_flush: settings.immediate_flush,
            state: Mutex::new(FileState {
                writer: None,
                current_size: 0,
                opened_at: now,
                period: rollover.period(&now),
                next_index: 0,
                retention: Retention::new(settings.max_history),
                compression: None,
            }),
            rollover,
            lifecycle: Lifecycle::new(),
            metrics: AppenderMetrics::new(),
            diagnostics,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rollover_pattern(&self) -> &RolloverPattern {
        &self.rollover
    }

    pub fn is_immediate_flush(&self) -> bool {
        self.immediate_flush
    }

    /// Rolled files currently tracked for retention, oldest first
    pub fn rolled_files(&self) -> Vec<PathBuf> {
        self.state.lock().retention.files().cloned().collect()
    }

    /// Open (creating if needed) the active file and take the lock
    fn open_active(&self, truncate: bool) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(&self.path).map_err(|e| {
            LoggerError::io_operation(
                "open log file",
                format!("Failed to open '{}'", self.path.display()),
                e,
            )
        })?;

        file.try_lock_exclusive()
            .map_err(|_| LoggerError::file_lock(self.path.display().to_string()))?;
        Ok(file)
    }

    fn should_roll(&self, state: &FileState, now: &DateTime<Local>) -> bool {
        if let Some(max) = self.max_file_size {
            if state.current_size >= max {
                return true;
            }
        }
        // Only a later instant opens a new period; late events stay in the
        // active file
        if *now <= state.opened_at {
            return false;
        }
        match (&state.period, self.rollover.period(now)) {
            (Some(current), Some(next)) => *current != next,
            _ => false,
        }
    }

    /// Next rollover name for the closing period that does not exist yet
    fn next_rollover_path(&self, state: &mut FileState) -> PathBuf {
        let mut index = state.next_index;
        loop {
            let candidate = self.rollover.render(&state.opened_at, index);
            if !candidate.exists() && !uncompressed_path(&candidate).exists() {
                state.next_index = index + 1;
                return candidate;
            }
            if !self.rollover.has_index() {
                // No %i to advance: disambiguate with a numeric suffix
                let base = uncompressed_path(&candidate);
                let mut suffix = 1u32;
                loop {
                    let mut name = base.clone().into_os_string();
                    name.push(format!(".{}", suffix));
                    let plain = PathBuf::from(name);
                    let fallback = if self.rollover.is_gzip() {
                        let mut gz = plain.clone().into_os_string();
                        gz.push(".gz");
                        PathBuf::from(gz)
                    } else {
                        plain.clone()
                    };
                    if !fallback.exists() && !plain.exists() {
                        return fallback;
                    }
                    suffix += 1;
                }
            }
            index += 1;
        }
    }

    /// Move the active file's period forward to `now`. Never moves back.
    fn advance_period(&self, state: &mut FileState, now: &DateTime<Local>) {
        if *now <= state.opened_at {
            return;
        }
        let period = self.rollover.period(now);
        if period != state.period {
            state.next_index = 0;
        }
        state.period = period;
        state.opened_at = *now;
    }

    /// Wait for the previous archive so at most one compression runs
    fn finish_compression(&self, state: &mut FileState) {
        if let Some(handle) = state.compression.take() {
            if handle.join().is_err() {
                self.report_rotation_failure(&LoggerError::file_rotation(
                    self.path.display().to_string(),
                    "compression thread panicked",
                ));
            }
        }
    }

    fn spawn_compression(&self, state: &mut FileState, source: PathBuf, target: PathBuf) {
        let diagnostics = self.diagnostics.clone();
        let name = self.name.clone();
        let (job_source, job_target) = (source.clone(), target.clone());
        let spawned = thread::Builder::new()
            .name(format!("log-compress-{}", self.name))
            .spawn(move || {
                if let Err(e) = compress_file(&job_source, &job_target) {
                    diagnostics.report(Diagnostic::RotationFailure {
                        appender: name,
                        error: e.to_string(),
                    });
                }
            });
        match spawned {
            Ok(handle) => state.compression = Some(handle),
            Err(_) => {
                if let Err(e) = compress_file(&source, &target) {
                    self.report_rotation_failure(&e);
                }
            }
        }
    }

    fn roll(&self, state: &mut FileState, now: &DateTime<Local>) -> Result<()> {
        self.finish_compression(state);

        // Dropping the writer closes the file and releases the lock
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let target = self.next_rollover_path(state);
        let renamed = if self.rollover.is_gzip() {
            uncompressed_path(&target)
        } else {
            target.clone()
        };

        if let Some(parent) = renamed.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::file_rotation(
                        renamed.display().to_string(),
                        format!("Failed to create rollover directory: {}", e),
                    )
                })?;
            }
        }

        fs::rename(&self.path, &renamed).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to rename to '{}': {}", renamed.display(), e),
            )
        })?;

        let rolled = if self.rollover.is_gzip() {
            self.spawn_compression(state, renamed, target.clone());
            target
        } else {
            renamed
        };
        self.metrics.record_rotation();

        for evicted in state.retention.record(rolled) {
            self.remove_rolled(&evicted);
            if self.rollover.is_gzip() {
                // An archive whose compression failed is still plain text
                self.remove_rolled(&uncompressed_path(&evicted));
            }
        }

        let file = self.open_active(true).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        state.writer = Some(BufWriter::new(file));
        state.current_size = 0;
        self.advance_period(state, now);
        Ok(())
    }

    fn remove_rolled(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.report_rotation_failure(&LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to remove old log file: {}", e),
                ));
            }
        }
    }

    /// Reopen the active file after a failed rotation
    fn recover(&self, state: &mut FileState, now: &DateTime<Local>) {
        if state.writer.is_some() {
            return;
        }
        match self.open_active(false) {
            Ok(file) => {
                state.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
                state.writer = Some(BufWriter::new(file));
            }
            Err(e) => self.report_rotation_failure(&e),
        }
        // Do not retry the time trigger on every write of this period
        self.advance_period(state, now);
    }

    fn report_rotation_failure(&self, error: &LoggerError) {
        self.diagnostics.report(Diagnostic::RotationFailure {
            appender: self.name.clone(),
            error: error.to_string(),
        });
    }
}

/// `app.log.gz` -> `app.log`
fn uncompressed_path(path: &Path) -> PathBuf {
    let text = path.as_os_str().to_string_lossy();
    match text.strip_suffix(".gz") {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

/// Gzip `source` into `target`, removing `source` only once the archive is
/// complete
fn compress_file(source: &Path, target: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let mut temp_name = target.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let input = File::open(source).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", source.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let cleanup = |e: std::io::Error, message: &str| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation("compress log file", message.to_string(), e)
    };

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| cleanup(e, "Failed to read from rolled file"))?;
        if bytes_read == 0 {
            break;
        }
        encoder
            .write_all(&buffer[..bytes_read])
            .map_err(|e| cleanup(e, "Failed to compress data chunk"))?;
    }

    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(|e| cleanup(e, "Failed to finish compression"))?;

    fs::rename(&temp_path, target)
        .map_err(|e| cleanup(e, "Failed to move compressed file into place"))?;

    // The archive is complete; a leftover source is only wasted space
    let _ = fs::remove_file(source);
    Ok(())
}

impl Appender for RollingFileAppender {
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
                    "RollingFileAppender",
                    format!("appender '{}' was stopped and cannot be restarted", self.name),
                ))
            }
            LifecycleState::Created => {}
        }

        let mut state = self.state.lock();
        let file = self.open_active(!self.append)?;
        let metadata = file.metadata().map_err(|e| {
            LoggerError::io_operation(
                "read log file metadata",
                format!("Cannot access '{}'", self.path.display()),
                e,
            )
        })?;

        let now = Local::now();
        // An appended file keeps the period it was last written in
        let opened_at = if self.append && metadata.len() > 0 {
            metadata
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or(now)
        } else {
            now
        };

        state.current_size = metadata.len();
        state.opened_at = opened_at;
        state.period = self.rollover.period(&opened_at);
        state.next_index = 0;
        state.retention.seed(&self.rollover, &self.path, &now);
        state.writer = Some(BufWriter::new(file));

        self.lifecycle.mark_started();
        Ok(())
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        if !self.lifecycle.is_started() {
            return Err(LoggerError::not_started(&self.name));
        }

        let record = self.encoder.format(event);
        let now = event.timestamp().with_timezone(&Local);

        let mut state = self.state.lock();
        if self.should_roll(&state, &now) {
            if let Err(e) = self.roll(&mut state, &now) {
                self.report_rotation_failure(&e);
                self.recover(&mut state, &now);
            }
        }

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::write_failure(&self.name, "log file is not open"))?;
        writer
            .write_all(record.as_bytes())
            .map_err(|e| LoggerError::write_failure(&self.name, e.to_string()))?;
        if self.immediate_flush {
            writer
                .flush()
                .map_err(|e| LoggerError::write_failure(&self.name, e.to_string()))?;
        }
        state.current_size += record.len() as u64;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(writer) = self.state.lock().writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.lifecycle.mark_stopped() {
            return Ok(());
        }
        let mut state = self.state.lock();
        self.finish_compression(&mut state);
        if let Some(mut writer) = state.writer.take() {
            writer.flush()?;
            if let Ok(file) = writer.into_inner() {
                let _ = FileExt::unlock(&file);
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

impl Drop for RollingFileAppender {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(writer) = state.writer.as_mut() {
            let _ = writer.flush();
        }
        if let Some(handle) = state.compression.take() {
            let _ = handle.join();
        }
    }
}
