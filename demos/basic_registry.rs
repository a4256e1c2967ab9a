//! Basic registry example
//!
//! Demonstrates console appenders, logger hierarchy, level inheritance and
//! additivity.
//!
//! Run with: cargo run --example basic_registry

use rust_appender_system::prelude::*;
use rust_appender_system::{debug, error, info, warn};

fn main() -> Result<()> {
    println!("=== Rust Appender System - Basic Registry Example ===\n");

    let registry = Registry::new();

    registry.create_appender(AppenderConfig::console(
        "CONSOLE",
        "%d{%H:%M:%S%.3f} %highlight(%-5level) %logger{20} - %msg%n",
    )?)?;
    registry.create_appender(AppenderConfig::console_to(
        "ERRORS",
        "!! %-5level [%thread] %logger - %msg%n",
        ConsoleTarget::Stderr,
    )?)?;
    registry.attach(ROOT_LOGGER, "CONSOLE")?;

    println!("1. Root logger at its default level:");
    debug!(registry, "com.example.App", "debug is visible by default");
    info!(registry, "com.example.App", "application started");

    println!("\n2. Raising the level of a subtree:");
    registry.set_level("com.example.db", Some(LogLevel::Warn));
    info!(registry, "com.example.db.Pool", "hidden: below WARN");
    warn!(registry, "com.example.db.Pool", "pool at {}% capacity", 90);

    println!("\n3. Extra appender on a subtree (additive):");
    registry.attach("com.example.db", "ERRORS")?;
    error!(registry, "com.example.db.Pool", "connection refused");

    println!("\n4. Same subtree, non-additive:");
    registry.set_additivity("com.example.db", false);
    error!(registry, "com.example.db.Pool", "only on stderr now");

    println!("\n5. Structured arguments:");
    let event = LogEvent::new("com.example.http", LogLevel::Info, "request served")
        .with_args(LogContext::new().with_field("status", 200).with_field("path", "/health"));
    registry.detach(ROOT_LOGGER, "CONSOLE");
    registry.create_appender(AppenderConfig::console("KVP", "%-5level %logger - %msg %kvp%n")?)?;
    registry.attach(ROOT_LOGGER, "KVP")?;
    registry.log_event(&event);

    let report = registry.stop_all()?;
    println!("\nStopped appenders: {:?}", report.stopped);
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
