//! Stress tests for concurrent delivery
//!
//! These tests verify:
//! - Concurrent producers never interleave partial lines
//! - Rotation under contention loses and duplicates nothing
//! - Events straddling a period boundary roll exactly once
//! - Async producers never block and every event is accounted for
//! - Attach/detach while logging never corrupts routing

use chrono::{Duration, Local, Utc};
use rust_appender_system::appenders::{ConsoleAppender, RollingFileAppender};
use rust_appender_system::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Byte-at-a-time writes make interleaving visible if the lock is missing
        let mut inner = self.0.lock();
        for byte in buf {
            inner.push(*byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn assert_well_formed(lines: &[&str]) {
    let mut seen = HashSet::new();
    for line in lines {
        let (thread, index) = line
            .strip_prefix("INFO  stress - t")
            .and_then(|rest| rest.split_once(" m"))
            .unwrap_or_else(|| panic!("malformed line: {:?}", line));
        let thread: usize = thread.parse().unwrap();
        let index: usize = index.parse().unwrap();
        assert!(thread < THREADS && index < PER_THREAD);
        assert!(seen.insert((thread, index)), "duplicate line {:?}", line);
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

fn produce(registry: &Arc<Registry>) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(registry);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    registry.log("stress", LogLevel::Info, format!("t{} m{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_console_lines_do_not_interleave() {
    let buffer = SharedBuffer::default();
    let appender = Arc::new(ConsoleAppender::with_writer(
        "CONSOLE",
        PatternEncoder::new("%-5level %logger - %msg%n").unwrap(),
        Box::new(buffer.clone()),
        Diagnostics::silent(),
    ));
    appender.start().unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let appender = Arc::clone(&appender);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let event = LogEvent::new("stress", LogLevel::Info, format!("t{} m{}", t, i));
                    appender.deliver(&event);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_well_formed(&lines);
    assert_eq!(appender.metrics().delivered(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_concurrent_rolling_file_with_rotation() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("stress.log");
    let settings = RollingFileSettings::new(
        &log_file,
        format!("{}/stress.%i.log", temp_dir.path().display()),
    )
    .with_max_file_size(FileSize::parse("16KB").unwrap())
    .with_max_history(0);

    let registry = Arc::new(
        Registry::builder()
            .diagnostics(Diagnostics::silent())
            .immediate_flush_override(false)
            .build(),
    );
    let file = registry
        .create_appender(
            AppenderConfig::rolling_file("FILE", "%-5level %logger - %msg%n", settings).unwrap(),
        )
        .unwrap();
    registry.attach(ROOT_LOGGER, "FILE").unwrap();

    produce(&registry);
    registry.stop_all().unwrap();
    assert!(file.metrics().rotations() > 0);

    let mut content = String::new();
    for entry in fs::read_dir(temp_dir.path()).unwrap() {
        content.push_str(&fs::read_to_string(entry.unwrap().path()).unwrap());
    }
    let lines: Vec<&str> = content.lines().collect();
    assert_well_formed(&lines);
}

#[test]
fn test_period_boundary_rolls_once_under_contention() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("boundary.log");
    let settings = RollingFileSettings::new(
        &log_file,
        format!("{}/boundary-%d{{%Y-%m-%d}}.log", temp_dir.path().display()),
    )
    .with_append(false)
    .with_immediate_flush(false);

    let appender = Arc::new(
        RollingFileAppender::new(
            "FILE",
            PatternEncoder::new("%msg%n").unwrap(),
            &settings,
            Diagnostics::silent(),
        )
        .unwrap(),
    );
    appender.start().unwrap();

    let today = Utc::now();
    let tomorrow = today + Duration::days(1);
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let appender = Arc::clone(&appender);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    // Alternate so late events keep arriving after the rollover
                    let (day, at) = if (t + i) % 2 == 0 {
                        ("today", today)
                    } else {
                        ("tomorrow", tomorrow)
                    };
                    let message = format!("{} t{} m{}", day, t, i);
                    let event = LogEvent::new("stress", LogLevel::Info, message).with_timestamp(at);
                    appender.deliver(&event);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    appender.stop().unwrap();

    assert_eq!(appender.metrics().rotations(), 1);
    let files: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 2, "unexpected files: {:?}", files);

    let closing = appender.rollover_pattern().render(&Local::now(), 0);
    let rolled = fs::read_to_string(&closing).unwrap();
    assert!(rolled.lines().all(|line| line.starts_with("today ")));

    let mut seen = HashSet::new();
    for line in rolled.lines().chain(fs::read_to_string(&log_file).unwrap().lines()) {
        assert!(seen.insert(line.to_string()), "duplicate line {:?}", line);
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn test_async_accounts_for_every_event() {
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("async.log");
    let settings = RollingFileSettings::new(
        &log_file,
        format!("{}/async-%d.%i.log", temp_dir.path().display()),
    )
    .with_max_file_size(FileSize::parse("100MB").unwrap());

    let registry = Arc::new(
        Registry::builder()
            .diagnostics(Diagnostics::silent())
            .immediate_flush_override(false)
            .build(),
    );
    let file = registry
        .create_appender(
            AppenderConfig::rolling_file("FILE", "%-5level %logger - %msg%n", settings).unwrap(),
        )
        .unwrap();
    let settings = AsyncSettings::new("FILE")
        .with_queue_capacity(64)
        .with_discarding_threshold(48);
    let queue = registry
        .create_appender(AppenderConfig::async_wrapper("ASYNC", settings).unwrap())
        .unwrap();
    registry.attach(ROOT_LOGGER, "ASYNC").unwrap();

    produce(&registry);
    let report = registry.stop_all().unwrap();

    let total = (THREADS * PER_THREAD) as u64;
    let accepted = queue.metrics().delivered();
    assert_eq!(accepted + queue.metrics().dropped(), total);
    assert_eq!(report.discarded, 0);
    assert_eq!(file.metrics().delivered(), accepted);

    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.lines().count() as u64, accepted);
}

#[test]
fn test_attach_detach_while_logging() {
    let registry = Arc::new(
        Registry::builder()
            .diagnostics(Diagnostics::silent())
            .immediate_flush_override(false)
            .build(),
    );
    for name in ["A", "B"] {
        registry
            .create_appender(AppenderConfig::console_to(name, "%msg%n", ConsoleTarget::Stderr).unwrap())
            .unwrap();
    }

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..1000 {
                    registry.log("churn", LogLevel::Debug, format!("{}", i));
                }
            })
        })
        .collect();

    for i in 0..200 {
        let name = if i % 2 == 0 { "A" } else { "B" };
        registry.attach("churn", name).unwrap();
        registry.detach("churn", name);
    }
    for handle in producers {
        handle.join().unwrap();
    }

    // Every attach was undone; each binding snapshot was consistent
    assert!(registry.binding("churn").unwrap().appenders().is_empty());
    let a = registry.appender("A").unwrap();
    let b = registry.appender("B").unwrap();
    assert_eq!(a.metrics().write_failures() + b.metrics().write_failures(), 0);
}
