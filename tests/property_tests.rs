//! Property-based tests for rust_appender_system using proptest

use chrono::{Local, TimeZone};
use proptest::prelude::*;
use rust_appender_system::prelude::*;
use rust_appender_system::RolloverPattern;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Ordering follows severity
    #[test]
    fn test_log_level_ordering(level1 in any_level(), level2 in any_level()) {
        let val1 = level1 as u8;
        let val2 = level2 as u8;

        prop_assert_eq!(level1 <= level2, val1 <= val2);
        prop_assert_eq!(level1 < level2, val1 < val2);
        prop_assert_eq!(level1 > level2, val1 > val2);
    }

    /// Parsing ignores case and surrounding whitespace
    #[test]
    fn test_log_level_case_insensitive(level in any_level(), mask in any::<u8>(), pad in 0usize..3) {
        let mixed: String = level
            .to_str()
            .chars()
            .enumerate()
            .map(|(i, c)| if mask & (1 << (i % 8)) != 0 { c.to_ascii_lowercase() } else { c })
            .collect();
        let input = format!("{}{}{}", " ".repeat(pad), mixed, " ".repeat(pad));
        prop_assert_eq!(input.parse::<LogLevel>(), Ok(level));
    }

    /// Strings that are not level names are rejected
    #[test]
    fn test_log_level_invalid_parse(invalid in "[a-z]{6,12}") {
        prop_assume!(!matches!(invalid.as_str(), "warning"));
        prop_assert!(invalid.parse::<LogLevel>().is_err());
    }
}

// ============================================================================
// LogEvent Sanitization Tests
// ============================================================================

proptest! {
    /// A message always renders on one line
    #[test]
    fn test_message_sanitization(message in ".*") {
        let event = LogEvent::new("app", LogLevel::Info, &message);

        prop_assert!(!event.message().contains('\n'));
        prop_assert!(!event.message().contains('\r'));
        prop_assert!(!event.message().contains('\t'));
        if message.contains('\n') {
            prop_assert!(event.message().contains("\\n"));
        }
    }

    /// Injected newlines cannot forge a second record
    #[test]
    fn test_log_injection_prevention(
        legitimate in "[a-zA-Z0-9 ]+",
        injected in prop_oneof![Just("ERROR"), Just("WARN")],
    ) {
        let encoder = PatternEncoder::new("%-5level %logger - %msg%n").unwrap();
        let malicious = format!("{}\n{} auth - admin login", legitimate, injected);
        let line = encoder.format(&LogEvent::new("auth", LogLevel::Info, malicious));

        prop_assert_eq!(line.lines().count(), 1);
        prop_assert!(line.starts_with("INFO "));
    }
}

// ============================================================================
// Encoder Tests
// ============================================================================

proptest! {
    /// Formatting the same event twice yields the same text
    #[test]
    fn test_encoder_is_pure(message in "[ -~]*", level in any_level(), logger in "[a-z]{1,8}(\\.[a-z]{1,8}){0,4}") {
        let encoder = PatternEncoder::default();
        let event = LogEvent::new(logger, level, message);
        prop_assert_eq!(encoder.format(&event), encoder.format(&event));
    }

    /// `%-N` pads to at least N; `%.N` never exceeds N
    #[test]
    fn test_width_modifiers(message in "[a-z]{0,40}", width in 1usize..30) {
        let event = LogEvent::new("app", LogLevel::Info, &message);

        let padded = PatternEncoder::new(&format!("%-{}msg", width)).unwrap().format(&event);
        prop_assert_eq!(padded.chars().count(), message.len().max(width));
        prop_assert!(padded.starts_with(message.as_str()));

        let truncated = PatternEncoder::new(&format!("%.{}msg", width)).unwrap().format(&event);
        prop_assert_eq!(truncated.chars().count(), message.len().min(width));
        prop_assert!(message.ends_with(truncated.as_str()));
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

proptest! {
    /// Sizes scale by binary units
    #[test]
    fn test_file_size_units(
        amount in 1u64..100_000,
        unit in prop_oneof![
            Just(("", 1u64)),
            Just(("B", 1)),
            Just(("kb", 1024)),
            Just(("KB", 1024)),
            Just(("MB", 1024 * 1024)),
            Just(("GB", 1024 * 1024 * 1024)),
        ],
    ) {
        let (suffix, multiplier) = unit;
        let size = FileSize::parse(&format!("{}{}", amount, suffix)).unwrap();
        prop_assert_eq!(size.bytes(), amount * multiplier);
    }

    /// Unknown suffixes never parse
    #[test]
    fn test_file_size_rejects_unknown_units(amount in 1u64..1000, unit in "[h-jn-z]{1,3}") {
        let input = format!("{}{}", amount, unit);
        prop_assert!(FileSize::parse(&input).is_err());
    }

    /// Every name a pattern renders is recognised as one of its rolled files
    #[test]
    fn test_rendered_names_match_pattern(
        index in 0u32..10_000,
        days in 0i64..3650,
        gzip in any::<bool>(),
    ) {
        let raw = if gzip { "logs/app-%d.%i.log.gz" } else { "logs/app-%d.%i.log" };
        let pattern = RolloverPattern::parse(raw).unwrap();
        let at = Local.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::days(days);

        let path = pattern.render(&at, index);
        let name = path.file_name().unwrap().to_str().unwrap();
        prop_assert!(pattern.matches_file_name(name));
        prop_assert!(!pattern.matches_file_name("app.log"));
    }
}

// ============================================================================
// Registry Tests
// ============================================================================

proptest! {
    /// Attaching any number of times leaves one attachment; one detach
    /// removes it
    #[test]
    fn test_attach_is_idempotent(times in 1usize..5, logger in "[a-z]{1,6}(\\.[a-z]{1,6}){0,3}") {
        let registry = Registry::builder()
            .diagnostics(Diagnostics::silent())
            .immediate_flush_override(false)
            .build();
        registry
            .create_appender(AppenderConfig::console_to("OUT", "%msg%n", ConsoleTarget::Stderr).unwrap())
            .unwrap();

        for _ in 0..times {
            registry.attach(&logger, "OUT").unwrap();
        }
        prop_assert_eq!(registry.binding(&logger).unwrap().appenders().len(), 1);

        prop_assert!(registry.detach(&logger, "OUT"));
        prop_assert!(!registry.detach(&logger, "OUT"));
        prop_assert!(registry.binding(&logger).unwrap().appenders().is_empty());
    }

    /// A logger's effective level is the nearest explicit level above it
    #[test]
    fn test_level_inheritance(
        root in any_level(),
        parent in proptest::option::of(any_level()),
        child in proptest::option::of(any_level()),
    ) {
        let registry = Registry::builder()
            .diagnostics(Diagnostics::silent())
            .immediate_flush_override(false)
            .build();
        registry.set_level(ROOT_LOGGER, Some(root));
        registry.set_level("com.example", parent);
        registry.set_level("com.example.db", child);

        let expected = child.or(parent).unwrap_or(root);
        prop_assert_eq!(registry.effective_level("com.example.db.pool"), expected);
        prop_assert_eq!(registry.effective_level("com.other"), root);
    }
}
