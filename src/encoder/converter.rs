//! Closed table of conversion words
//!
//! Every converter is a pure function of the event. The word-to-converter
//! mapping is fixed here and resolved once while the pattern is compiled.

use crate::core::{LogEvent, LoggerError, Result, TimestampFormat};

/// Background thread names that carry a volatile counter or suffix. Names
/// starting with one of these collapse to the prefix so pattern columns
/// and file sizes stay stable.
const VOLATILE_THREAD_PREFIXES: [&str; 2] = ["CM Event Dispatcher", "Background Update"];

const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Converter {
    Literal(String),
    Date(TimestampFormat),
    Level,
    Thread,
    ThreadId,
    Logger { length: Option<usize> },
    Message,
    Args,
    Newline,
    Highlight(Vec<Segment>),
}

/// `%[-][min][.max]` format modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FormatModifier {
    pub left_align: bool,
    pub min_width: usize,
    pub max_width: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Segment {
    pub converter: Converter,
    pub modifier: Option<FormatModifier>,
}

impl Segment {
    pub fn literal(text: String) -> Self {
        Self {
            converter: Converter::Literal(text),
            modifier: None,
        }
    }

    pub fn write(&self, event: &LogEvent, out: &mut String) {
        match self.modifier {
            None => self.converter.write(event, out),
            Some(modifier) => {
                let mut buf = String::new();
                self.converter.write(event, &mut buf);
                modifier.apply(&buf, out);
            }
        }
    }
}

impl FormatModifier {
    fn apply(&self, value: &str, out: &mut String) {
        let mut value = value;
        let mut len = value.chars().count();

        // Truncation keeps the rightmost characters
        if let Some(max) = self.max_width {
            if len > max {
                let skip = len - max;
                let start = value
                    .char_indices()
                    .nth(skip)
                    .map(|(i, _)| i)
                    .unwrap_or(value.len());
                value = &value[start..];
                len = max;
            }
        }

        let padding = self.min_width.saturating_sub(len);
        if self.left_align {
            out.push_str(value);
            out.extend(std::iter::repeat(' ').take(padding));
        } else {
            out.extend(std::iter::repeat(' ').take(padding));
            out.push_str(value);
        }
    }
}

impl Converter {
    /// Resolve a conversion word.
    ///
    /// `children` is the parsed sub-pattern of a composite word such as
    /// `%highlight(...)`; simple words reject it.
    pub fn resolve(
        word: &str,
        option: Option<&str>,
        children: Option<Vec<Segment>>,
    ) -> Result<Self> {
        let converter = match word {
            "highlight" => {
                let children = children.ok_or_else(|| {
                    LoggerError::config("PatternEncoder", "%highlight requires a sub-pattern: %highlight(...)")
                })?;
                return Ok(Converter::Highlight(children));
            }
            "d" | "date" => {
                let format = TimestampFormat::from_option(option);
                format
                    .validate()
                    .map_err(|e| LoggerError::config("PatternEncoder", e))?;
                Converter::Date(format)
            }
            "p" | "le" | "level" => Converter::Level,
            "t" | "thread" => Converter::Thread,
            "tid" | "threadId" => Converter::ThreadId,
            "c" | "lo" | "logger" => {
                let length = match option {
                    None => None,
                    Some(text) => Some(text.trim().parse::<usize>().map_err(|_| {
                        LoggerError::config(
                            "PatternEncoder",
                            format!("logger length must be a number, got '{}'", text),
                        )
                    })?),
                };
                Converter::Logger { length }
            }
            "m" | "msg" | "message" => Converter::Message,
            "kvp" | "args" => Converter::Args,
            "n" => Converter::Newline,
            other => {
                return Err(LoggerError::config(
                    "PatternEncoder",
                    format!("unknown conversion word '%{}'", other),
                ))
            }
        };

        if children.is_some() {
            return Err(LoggerError::config(
                "PatternEncoder",
                format!("'%{}' does not accept a sub-pattern", word),
            ));
        }
        Ok(converter)
    }

    pub fn write(&self, event: &LogEvent, out: &mut String) {
        match self {
            Converter::Literal(text) => out.push_str(text),
            Converter::Date(format) => format.write_to(out, event.timestamp()),
            Converter::Level => out.push_str(event.level().to_str()),
            Converter::Thread => {
                out.push_str(collapse_thread_name(event.thread_name().unwrap_or(event.thread_id())))
            }
            Converter::ThreadId => out.push_str(event.thread_id()),
            Converter::Logger { length } => match length {
                None => out.push_str(event.logger()),
                Some(length) => out.push_str(&abbreviate_logger(event.logger(), *length)),
            },
            Converter::Message => out.push_str(event.message()),
            Converter::Args => {
                if let Some(args) = event.args() {
                    args.write_to(out);
                }
            }
            Converter::Newline => out.push('\n'),
            Converter::Highlight(children) => {
                let color = event.level().color_code();
                out.push_str("\x1b[");
                if event.level() == crate::core::LogLevel::Error {
                    out.push_str("1;");
                }
                out.push_str(&color.to_fg_str());
                out.push('m');
                for child in children {
                    child.write(event, out);
                }
                out.push_str(ANSI_RESET);
            }
        }
    }
}

/// Collapse volatile background thread names to their stable prefix
pub(crate) fn collapse_thread_name(name: &str) -> &str {
    VOLATILE_THREAD_PREFIXES
        .iter()
        .find(|prefix| name.starts_with(**prefix))
        .copied()
        .unwrap_or(name)
}

/// Shorten a dotted logger name to roughly `target` characters by reducing
/// leading segments to their first letter, left to right. The last segment
/// is never shortened; `0` keeps only the last segment.
pub(crate) fn abbreviate_logger(name: &str, target: usize) -> String {
    if target == 0 {
        return name.rsplit('.').next().unwrap_or(name).to_string();
    }
    if name.len() <= target {
        return name.to_string();
    }

    let segments: Vec<&str> = name.split('.').collect();
    let last = segments.len() - 1;
    let mut total = name.len();
    let mut out = String::with_capacity(target);

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        match segment.chars().next() {
            Some(first) if i < last && total > target => {
                out.push(first);
                total -= segment.len() - first.len_utf8();
            }
            _ => out.push_str(segment),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_thread_name() {
        assert_eq!(collapse_thread_name("CM Event Dispatcher #12"), "CM Event Dispatcher");
        assert_eq!(
            collapse_thread_name("Background Update 3fa2 (bundle 42)"),
            "Background Update"
        );
        assert_eq!(collapse_thread_name("main"), "main");
        assert_eq!(collapse_thread_name("CM Configuration Updater"), "CM Configuration Updater");
    }

    #[test]
    fn test_abbreviate_logger() {
        let name = "com.adeptj.runtime.server.Launcher";
        assert_eq!(abbreviate_logger(name, 0), "Launcher");
        assert_eq!(abbreviate_logger(name, 100), name);
        assert_eq!(abbreviate_logger(name, 27), "c.a.runtime.server.Launcher");
        assert_eq!(abbreviate_logger(name, 25), "c.a.r.server.Launcher");
        assert_eq!(abbreviate_logger(name, 5), "c.a.r.s.Launcher");
        assert_eq!(abbreviate_logger("Launcher", 3), "Launcher");
    }

    #[test]
    fn test_modifier_pads_and_truncates() {
        let mut out = String::new();
        FormatModifier {
            left_align: true,
            min_width: 5,
            max_width: None,
        }
        .apply("INFO", &mut out);
        assert_eq!(out, "INFO ");

        out.clear();
        FormatModifier {
            left_align: false,
            min_width: 6,
            max_width: None,
        }
        .apply("WARN", &mut out);
        assert_eq!(out, "  WARN");

        out.clear();
        FormatModifier {
            left_align: false,
            min_width: 0,
            max_width: Some(4),
        }
        .apply("com.example", &mut out);
        assert_eq!(out, "mple");
    }

    #[test]
    fn test_unknown_word_is_rejected() {
        let err = Converter::resolve("mdc", None, None).unwrap_err();
        assert!(err.to_string().contains("unknown conversion word '%mdc'"));
    }

    #[test]
    fn test_highlight_requires_children() {
        assert!(Converter::resolve("highlight", None, None).is_err());
        assert!(Converter::resolve("level", None, Some(Vec::new())).is_err());
    }
}
