//! Rollover file naming and retention
//!
//! A rollover pattern names rolled files with two tokens:
//!
//! - `%d` or `%d{strftime}`: the period of the closing file (default
//!   `%Y-%m-%d`, local time). It also defines the time trigger: an event
//!   later than the start of the active file whose formatted date differs
//!   starts a new period. Earlier events never reopen an old one.
//! - `%i`: an index that restarts at 0 for every period and skips names
//!   that already exist.
//!
//! A pattern without `%i` whose name is already taken gets a `.N` suffix
//! (`app-2025-03-09.log.1`, or `app-2025-03-09.log.1.gz` when gzipped).
//!
//! A pattern ending in `.gz` gzips the rolled file.

use crate::core::{LoggerError, Result};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Date,
    Index,
}

/// Compiled rollover file-name pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverPattern {
    raw: String,
    parts: Vec<Part>,
    date_format: Option<String>,
}

impl RolloverPattern {
    /// Compile a rollover pattern.
    ///
    /// ```
    /// use rust_appender_system::RolloverPattern;
    ///
    /// let pattern = RolloverPattern::parse("logs/app-%d{%Y-%m}.%i.log.gz").unwrap();
    /// assert!(pattern.is_gzip());
    /// assert!(RolloverPattern::parse("logs/app.log").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut date_format = None;
        let mut has_index = false;
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('d') => {
                    if date_format.is_some() {
                        return Err(invalid(raw, "only one %d token is allowed"));
                    }
                    let mut format = String::new();
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        let mut closed = false;
                        for c in chars.by_ref() {
                            if c == '}' {
                                closed = true;
                                break;
                            }
                            format.push(c);
                        }
                        if !closed {
                            return Err(invalid(raw, "unclosed '{' after %d"));
                        }
                    }
                    if format.is_empty() {
                        format.push_str(DEFAULT_DATE_FORMAT);
                    }
                    let has_error = chrono::format::StrftimeItems::new(&format)
                        .any(|item| matches!(item, chrono::format::Item::Error));
                    if has_error {
                        return Err(invalid(raw, &format!("invalid date format '{}'", format)));
                    }
                    date_format = Some(format);
                    push_literal(&mut parts, &mut literal);
                    parts.push(Part::Date);
                }
                Some('i') => {
                    if has_index {
                        return Err(invalid(raw, "only one %i token is allowed"));
                    }
                    has_index = true;
                    push_literal(&mut parts, &mut literal);
                    parts.push(Part::Index);
                }
                Some(other) => {
                    return Err(invalid(raw, &format!("unknown token '%{}'", other)));
                }
                None => return Err(invalid(raw, "dangling '%'")),
            }
        }
        push_literal(&mut parts, &mut literal);

        if date_format.is_none() && !has_index {
            return Err(invalid(raw, "pattern needs a %d or %i token"));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
            date_format,
        })
    }

    /// Check the pattern carries the tokens its triggers need: a size
    /// trigger needs `%i`, a purely time-based policy needs `%d`.
    pub fn check_triggers(&self, has_size_trigger: bool) -> Result<()> {
        if has_size_trigger && !self.has_index() {
            return Err(invalid(&self.raw, "a max file size requires a %i token"));
        }
        if !has_size_trigger && !self.has_date() {
            return Err(invalid(&self.raw, "time based rollover requires a %d token"));
        }
        Ok(())
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn has_date(&self) -> bool {
        self.date_format.is_some()
    }

    pub fn has_index(&self) -> bool {
        self.parts.contains(&Part::Index)
    }

    pub fn is_gzip(&self) -> bool {
        self.raw.ends_with(".gz")
    }

    /// The period key of `at`, or `None` if the pattern has no `%d`
    pub fn period(&self, at: &DateTime<Local>) -> Option<String> {
        self.date_format
            .as_ref()
            .map(|format| at.format(format).to_string())
    }

    /// Render the rolled file name for a period and index
    pub fn render(&self, at: &DateTime<Local>, index: u32) -> PathBuf {
        let mut out = String::with_capacity(self.raw.len() + 16);
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Date => {
                    if let Some(period) = self.period(at) {
                        out.push_str(&period);
                    }
                }
                Part::Index => out.push_str(&index.to_string()),
            }
        }
        PathBuf::from(out)
    }

    /// Directory rolled files land in
    pub fn directory(&self, at: &DateTime<Local>) -> PathBuf {
        match self.render(at, 0).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Whether `file_name` could have been produced by this pattern,
    /// including `.N` collision names
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let parts = self.file_name_parts();
        match_parts(&parts, file_name)
            || strip_collision_suffix(file_name, self.is_gzip())
                .is_some_and(|base| match_parts(&parts, &base))
    }

    /// Parts after the last path separator in a literal
    fn file_name_parts(&self) -> Vec<Part> {
        let mut tail = Vec::new();
        for part in self.parts.iter().rev() {
            if let Part::Literal(text) = part {
                if let Some(pos) = text.rfind(['/', '\\']) {
                    let rest = &text[pos + 1..];
                    if !rest.is_empty() {
                        tail.push(Part::Literal(rest.to_string()));
                    }
                    break;
                }
            }
            tail.push(part.clone());
        }
        tail.reverse();
        tail
    }
}

fn push_literal(parts: &mut Vec<Part>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(Part::Literal(std::mem::take(literal)));
    }
}

fn invalid(raw: &str, message: &str) -> LoggerError {
    LoggerError::config(
        "RolloverPattern",
        format!("'{}': {}", raw, message),
    )
}

/// `app.log.3` -> `app.log`, `app.log.3.gz` -> `app.log.gz`
fn strip_collision_suffix(name: &str, gzip: bool) -> Option<String> {
    let (stem, extension) = if gzip {
        (name.strip_suffix(".gz")?, ".gz")
    } else {
        (name, "")
    };
    let (base, suffix) = stem.rsplit_once('.')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}{}", base, extension))
}

/// Match a name against pattern parts. A date consumes one or more
/// characters, an index one or more digits.
fn match_parts(parts: &[Part], name: &str) -> bool {
    match parts.split_first() {
        None => name.is_empty(),
        Some((Part::Literal(text), rest)) => name
            .strip_prefix(text.as_str())
            .is_some_and(|remaining| match_parts(rest, remaining)),
        Some((Part::Index, rest)) => {
            let digits = name.chars().take_while(char::is_ascii_digit).count();
            (1..=digits).rev().any(|n| match_parts(rest, &name[n..]))
        }
        Some((Part::Date, rest)) => name
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .chain(std::iter::once(name.len()))
            .any(|end| end > 0 && match_parts(rest, &name[end..])),
    }
}

/// Rolled files kept on disk, oldest first
#[derive(Debug)]
pub(crate) struct Retention {
    max_history: usize,
    rolled: VecDeque<PathBuf>,
}

impl Retention {
    /// `max_history == 0` keeps every rolled file
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            rolled: VecDeque::new(),
        }
    }

    /// Discover rolled files left by an earlier run, ordered by
    /// modification time and then name.
    pub fn seed(&mut self, pattern: &RolloverPattern, active: &Path, now: &DateTime<Local>) {
        let dir = pattern.directory(now);
        let Ok(entries) = fs::read_dir(&dir) else {
            return;
        };

        let mut found: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| pattern.matches_file_name(name))
            })
            .map(|entry| {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, dir.join(entry.file_name()))
            })
            .filter(|(_, path)| !same_file(path, active))
            .collect();

        found.sort();
        self.rolled = found.into_iter().map(|(_, path)| path).collect();
    }

    /// Record a freshly rolled file and return the files that fell out of
    /// the history window, oldest first. The caller deletes them.
    pub fn record(&mut self, path: PathBuf) -> Vec<PathBuf> {
        self.rolled.push_back(path);
        let mut evicted = Vec::new();
        if self.max_history > 0 {
            while self.rolled.len() > self.max_history {
                if let Some(oldest) = self.rolled.pop_front() {
                    evicted.push(oldest);
                }
            }
        }
        evicted
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rolled.len()
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.rolled.iter()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
