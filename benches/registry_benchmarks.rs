//! Criterion benchmarks for rust_appender_system

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_appender_system::prelude::*;
use rust_appender_system::{AsyncAppender, ConsoleAppender};
use std::io;
use std::sync::Arc;
use std::thread;

fn quiet_registry() -> Registry {
    Registry::builder()
        .diagnostics(Diagnostics::silent())
        .immediate_flush_override(false)
        .build()
}

fn sink_appender(name: &str, pattern: &str) -> Arc<dyn Appender> {
    let appender = ConsoleAppender::with_writer(
        name,
        PatternEncoder::new(pattern).unwrap(),
        Box::new(io::sink()),
        Diagnostics::silent(),
    );
    appender.start().unwrap();
    Arc::new(appender)
}

// ============================================================================
// Encoder Benchmarks
// ============================================================================

fn bench_encoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoder");
    group.throughput(Throughput::Elements(1));

    let event = LogEvent::new(
        "com.example.service.OrderProcessor",
        LogLevel::Info,
        "processed order 4711 in 12ms",
    )
    .with_args(LogContext::new().with_field("order_id", 4711).with_field("region", "eu"));

    let patterns = [
        ("message_only", "%msg%n"),
        ("default", rust_appender_system::DEFAULT_PATTERN),
        ("abbreviated", "%d %-5level [%thread] %logger{20} - %msg %kvp%n"),
        ("highlight", "%highlight(%-5level) %logger{0} - %msg%n"),
    ];
    for (name, pattern) in patterns {
        let encoder = PatternEncoder::new(pattern).unwrap();
        group.bench_with_input(BenchmarkId::new("format", name), &event, |b, event| {
            b.iter(|| black_box(encoder.format(black_box(event))));
        });
    }

    group.bench_function("compile_default", |b| {
        b.iter(|| black_box(PatternEncoder::new(black_box(rust_appender_system::DEFAULT_PATTERN))));
    });

    group.finish();
}

// ============================================================================
// Registry Routing Benchmarks
// ============================================================================

fn bench_registry_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_log");
    group.throughput(Throughput::Elements(1));

    let temp_dir = tempfile::tempdir().unwrap();
    let registry = quiet_registry();
    let settings = RollingFileSettings::new(
        temp_dir.path().join("bench.log"),
        format!("{}/bench.%i.log", temp_dir.path().display()),
    )
    .with_max_file_size(FileSize::parse("10MB").unwrap())
    .with_max_history(3);
    registry
        .create_appender(AppenderConfig::rolling_file("FILE", "%-5level %logger - %msg%n", settings).unwrap())
        .unwrap();
    registry.attach(ROOT_LOGGER, "FILE").unwrap();

    group.bench_function("rolling_file", |b| {
        b.iter(|| registry.log("com.example.bench", LogLevel::Info, black_box("benchmark message")));
    });

    registry.set_level(ROOT_LOGGER, Some(LogLevel::Warn));
    group.bench_function("filtered_out", |b| {
        b.iter(|| registry.log("com.example.bench", LogLevel::Debug, black_box("never formatted")));
    });

    group.bench_function("effective_level_deep", |b| {
        b.iter(|| black_box(registry.effective_level(black_box("com.example.bench.deep.nested.logger"))));
    });

    group.finish();
}

// ============================================================================
// Async Delivery Benchmarks
// ============================================================================

fn bench_async_deliver(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_deliver");
    group.throughput(Throughput::Elements(1));

    for capacity in [256usize, 8192] {
        let settings = AsyncSettings::new("SINK").with_queue_capacity(capacity);
        let appender = AsyncAppender::new(
            "ASYNC",
            sink_appender("SINK", "%-5level %logger - %msg%n"),
            &settings,
            Diagnostics::silent(),
        )
        .unwrap();
        appender.start().unwrap();

        let event = LogEvent::new("com.example.bench", LogLevel::Warn, "queued message");
        group.bench_with_input(BenchmarkId::new("capacity", capacity), &event, |b, event| {
            b.iter(|| appender.deliver(black_box(event)));
        });
        appender.stop().unwrap();
    }

    group.finish();
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers");

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * 1000) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let registry = Arc::new(quiet_registry());
            registry
                .create_appender(AppenderConfig::console_to("OUT", "%msg%n", ConsoleTarget::Stderr).unwrap())
                .unwrap();
            registry.set_level(ROOT_LOGGER, Some(LogLevel::Info));

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let registry = Arc::clone(&registry);
                        thread::spawn(move || {
                            for i in 0..1000 {
                                registry.log("bench", LogLevel::Debug, format!("message {}", i));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encoder,
    bench_registry_log,
    bench_async_deliver,
    bench_concurrent_producers,
);

criterion_main!(benches);
