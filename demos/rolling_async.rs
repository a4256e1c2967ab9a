//! Rolling file behind an async appender
//!
//! Configures the registry from JSON: a size and date triggered rolling
//! file with gzip and retention, wrapped by a bounded async queue.
//!
//! Run with: cargo run --example rolling_async

use rust_appender_system::prelude::*;
use rust_appender_system::RegistryConfig;
use std::sync::Arc;
use std::thread;

const CONFIG: &str = r#"{
    "appenders": [
        {
            "kind": "rolling_file",
            "name": "FILE",
            "pattern": "%d %-5level [%thread] %logger{30} - %msg%n",
            "file": "demo_logs/app.log",
            "rollover_pattern": "demo_logs/app-%d.%i.log.gz",
            "max_file_size": "64KB",
            "max_history": 5
        },
        {
            "kind": "async",
            "name": "ASYNC",
            "appender_ref": "FILE",
            "queue_capacity": 1024,
            "discarding_threshold": 800,
            "shutdown_timeout_ms": 2000
        }
    ],
    "loggers": [
        { "names": ["ROOT"], "level": "INFO", "appenders": ["ASYNC"] }
    ]
}"#;

fn main() -> Result<()> {
    println!("=== Rust Appender System - Rolling Async Example ===\n");

    let registry = Arc::new(Registry::new());
    registry.configure(&RegistryConfig::from_json(CONFIG)?)?;
    println!("Appenders: {:?}", registry.appender_names());

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn(move || {
                    for i in 0..5_000 {
                        let level = if i % 100 == 0 { LogLevel::Warn } else { LogLevel::Info };
                        registry.log("com.example.worker", level, format!("worker {} item {}", worker, i));
                    }
                })
        })
        .collect::<std::io::Result<_>>()
        .map_err(|e| LoggerError::io_operation("spawn worker", "demo worker", e))?;
    for handle in handles {
        let _ = handle.join();
    }

    let queue = registry.appender("ASYNC").map(|a| a.metrics().dropped()).unwrap_or(0);
    let report = registry.stop_all()?;
    let file = registry.appender("FILE");

    println!("Dropped by the queue: {}", queue);
    println!("Discarded at shutdown: {}", report.discarded);
    if let Some(file) = file {
        println!("Rotations: {}", file.metrics().rotations());
    }
    println!("\n=== Example completed successfully! ===");
    println!("Check 'demo_logs/' for the active file and gzipped archives");

    Ok(())
}
