//! Pattern parser
//!
//! Grammar:
//!
//! ```text
//! pattern  := (literal | "%%" | token)*
//! token    := "%" modifier? word ("{" option "}")? ("(" pattern ")")?
//! modifier := "-"? digits? ("." digits)?
//! ```

use super::converter::{Converter, FormatModifier, Segment};
use crate::core::{LoggerError, Result};
use std::iter::Peekable;
use std::str::Chars;

pub(crate) fn parse(pattern: &str) -> Result<Vec<Segment>> {
    if pattern.is_empty() {
        return Err(LoggerError::config("PatternEncoder", "pattern must not be empty"));
    }
    let mut parser = Parser {
        chars: pattern.chars().peekable(),
        depth: 0,
    };
    parser.segments()
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn segments(&mut self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.chars.next() {
            match c {
                '%' if self.chars.peek() == Some(&'%') => {
                    self.chars.next();
                    literal.push('%');
                }
                '%' => {
                    if !literal.is_empty() {
                        segments.push(Segment::literal(std::mem::take(&mut literal)));
                    }
                    segments.push(self.token()?);
                }
                ')' if self.depth > 0 => {
                    if !literal.is_empty() {
                        segments.push(Segment::literal(literal));
                    }
                    return Ok(segments);
                }
                other => literal.push(other),
            }
        }

        if self.depth > 0 {
            return Err(LoggerError::config("PatternEncoder", "unclosed '(' in pattern"));
        }
        if !literal.is_empty() {
            segments.push(Segment::literal(literal));
        }
        Ok(segments)
    }

    fn token(&mut self) -> Result<Segment> {
        let modifier = self.modifier()?;

        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if word.is_empty() {
            return Err(LoggerError::config(
                "PatternEncoder",
                "missing conversion word after '%'",
            ));
        }

        let option = if self.chars.peek() == Some(&'{') {
            self.chars.next();
            Some(self.option()?)
        } else {
            None
        };

        let children = if self.chars.peek() == Some(&'(') {
            self.chars.next();
            self.depth += 1;
            let children = self.segments()?;
            self.depth -= 1;
            Some(children)
        } else {
            None
        };

        let converter = Converter::resolve(&word, option.as_deref(), children)?;
        Ok(Segment {
            converter,
            modifier,
        })
    }

    fn modifier(&mut self) -> Result<Option<FormatModifier>> {
        let mut modifier = FormatModifier::default();
        let mut present = false;

        if self.chars.peek() == Some(&'-') {
            self.chars.next();
            modifier.left_align = true;
            present = true;
        }
        if let Some(min) = self.number() {
            modifier.min_width = min;
            present = true;
        }
        if self.chars.peek() == Some(&'.') {
            self.chars.next();
            let max = self.number().ok_or_else(|| {
                LoggerError::config("PatternEncoder", "expected a width after '.'")
            })?;
            modifier.max_width = Some(max);
            present = true;
        }

        Ok(present.then_some(modifier))
    }

    fn number(&mut self) -> Option<usize> {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        digits.parse().ok()
    }

    fn option(&mut self) -> Result<String> {
        let mut option = String::new();
        for c in self.chars.by_ref() {
            if c == '}' {
                return Ok(option);
            }
            option.push(c);
        }
        Err(LoggerError::config("PatternEncoder", "unclosed '{' in pattern"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals_and_tokens() {
        let segments = parse("[%level] %msg%n").unwrap();
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0].converter, Converter::Literal("[".to_string()));
        assert_eq!(segments[1].converter, Converter::Level);
        assert_eq!(segments[2].converter, Converter::Literal("] ".to_string()));
        assert_eq!(segments[3].converter, Converter::Message);
        assert_eq!(segments[4].converter, Converter::Newline);
    }

    #[test]
    fn test_parse_modifier() {
        let segments = parse("%-5.10level").unwrap();
        assert_eq!(
            segments[0].modifier,
            Some(FormatModifier {
                left_align: true,
                min_width: 5,
                max_width: Some(10),
            })
        );
    }

    #[test]
    fn test_parse_composite() {
        let segments = parse("%highlight(%-5level) x").unwrap();
        match &segments[0].converter {
            Converter::Highlight(children) => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].converter, Converter::Level);
            }
            other => panic!("expected highlight, got {:?}", other),
        }
        assert_eq!(segments[1].converter, Converter::Literal(" x".to_string()));
    }

    #[test]
    fn test_escaped_percent_and_top_level_paren() {
        let segments = parse("100%% (done)").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].converter,
            Converter::Literal("100% (done)".to_string())
        );
    }

    #[test]
    fn test_malformed_patterns_fail() {
        assert!(parse("").is_err());
        assert!(parse("%").is_err());
        assert!(parse("%-5").is_err());
        assert!(parse("%d{%Y").is_err());
        assert!(parse("%highlight(%level").is_err());
        assert!(parse("%5.level").is_err());
        assert!(parse("%bogus").is_err());
    }
}
