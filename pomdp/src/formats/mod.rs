//! Input file formats.
//!
//! Two plain-text formats are supported: the model definition format read by
//! [`pomdp`] and the alpha-vector value-function format read by [`alpha`].
//! Both are line oriented; the whole file is loaded up front and the parsers
//! work on the resulting slice of lines.

use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use num_traits::Float;
use regex::Regex;
use thiserror::Error;

pub mod alpha;
pub mod header;
pub mod pomdp;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File `{}` does not exist.", .0.display())]
    FileNotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Missing required header field `{0}:`.")]
    MissingHeader(&'static str),
    #[error("Line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("Line {line}: unable to convert `{token}` to a number.")]
    Numeric { line: usize, token: String },
}

impl ParseError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn numeric(line: usize, token: impl Into<String>) -> Self {
        Self::Numeric {
            line,
            token: token.into(),
        }
    }

    /// The 1-based line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Format { line, .. } | Self::Numeric { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Reads the whole file at *path* into memory.
pub fn read_source(path: &Path) -> Result<String, ParseError> {
    std::fs::read_to_string(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => ParseError::FileNotFound(path.to_owned()),
        _ => ParseError::Io(error),
    })
}

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("number pattern is valid")
});

/// Returns all floating-point literals of *line* from left to right.
///
/// Surrounding text is ignored. Exponents (`1e-3`) are part of the literal.
pub fn scan_numbers(line: &str) -> impl Iterator<Item = &str> {
    NUMBER.find_iter(line).map(|found| found.as_str())
}

pub(crate) fn parse_float<F: Float>(token: &str, line: usize) -> Result<F, ParseError> {
    F::from_str_radix(token, 10).map_err(|_| ParseError::numeric(line, token))
}

/// Drops everything from the first `#` on.
pub(crate) fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(content, _)| content)
}

pub(crate) struct Cursor<'i> {
    tail: &'i str,
    line: usize,
}

impl<'i> Cursor<'i> {
    pub fn new(input: &'i str, line: usize) -> Self {
        let mut this = Self { tail: input, line };
        this.consume_whitespace();
        this
    }

    pub fn consume_whitespace(&mut self) {
        self.tail = self.tail.trim_start()
    }

    pub fn consume_tag(&mut self, tag: impl AsRef<str>) -> Result<(), ParseError> {
        let tag = tag.as_ref();
        if self.try_consume_tag(tag) {
            Ok(())
        } else {
            Err(ParseError::format(
                self.line,
                format!("Expected `{tag}` but found `{}`.", self.tail),
            ))
        }
    }

    /// Consumes *tag* if the input starts with it.
    pub fn try_consume_tag(&mut self, tag: impl AsRef<str>) -> bool {
        match self.tail.strip_prefix(tag.as_ref()) {
            Some(tail) => {
                self.tail = tail;
                self.consume_whitespace();
                true
            }
            None => false,
        }
    }

    /// Consumes a field of a table line, i.e., everything up to the next
    /// whitespace or `:`.
    pub fn consume_field(&mut self) -> Result<&'i str, ParseError> {
        let length = self
            .tail
            .find(|c: char| c.is_whitespace() || c == ':')
            .unwrap_or(self.tail.len());
        if length > 0 {
            let field = &self.tail[..length];
            self.tail = &self.tail[length..];
            self.consume_whitespace();
            Ok(field)
        } else {
            Err(ParseError::format(self.line, "Expected field."))
        }
    }

    pub fn consume_number(&mut self) -> Result<&'i str, ParseError> {
        let mut chars = self.tail.chars();
        while chars.as_str().starts_with(|c: char| {
            c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+')
        }) {
            chars.next();
        }
        let length = self.tail.len() - chars.as_str().len();
        if length > 0 {
            let number = &self.tail[..length];
            self.tail = chars.as_str();
            self.consume_whitespace();
            Ok(number)
        } else {
            let token = self.tail.split_whitespace().next().unwrap_or_default();
            Err(ParseError::numeric(self.line, token))
        }
    }

    pub fn consume_float<F: Float>(&mut self) -> Result<F, ParseError> {
        let number = self.consume_number()?;
        parse_float(number, self.line)
    }

    pub fn rest(&self) -> &'i str {
        self.tail.trim_end()
    }

    pub fn is_empty(&self) -> bool {
        self.tail.trim_end().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_numbers_left_to_right() {
        let numbers: Vec<_> = scan_numbers("0.25 0.75\t-1 +3.5").collect();
        assert_eq!(numbers, ["0.25", "0.75", "-1", "+3.5"]);
    }

    #[test]
    fn scans_numbers_with_exponents() {
        let numbers: Vec<_> = scan_numbers("1e-3 2.5E+2 .5").collect();
        assert_eq!(numbers, ["1e-3", "2.5E+2", ".5"]);
        assert_eq!(parse_float::<f64>("2.5E+2", 1).unwrap(), 250.0);
    }

    #[test]
    fn ignores_surrounding_text() {
        let numbers: Vec<_> = scan_numbers("value = 0.5;").collect();
        assert_eq!(numbers, ["0.5"]);
        assert_eq!(scan_numbers("identity").count(), 0);
    }

    #[test]
    fn cursor_splits_fields() {
        let mut cursor = Cursor::new("T: listen : * : tiger-left 0.5", 3);
        cursor.consume_tag("T").unwrap();
        cursor.consume_tag(":").unwrap();
        assert_eq!(cursor.consume_field().unwrap(), "listen");
        cursor.consume_tag(":").unwrap();
        assert_eq!(cursor.consume_field().unwrap(), "*");
        cursor.consume_tag(":").unwrap();
        assert_eq!(cursor.consume_field().unwrap(), "tiger-left");
        assert_eq!(cursor.consume_float::<f64>().unwrap(), 0.5);
        assert!(cursor.is_empty());
    }

    #[test]
    fn cursor_reports_line() {
        let mut cursor = Cursor::new("O listen", 7);
        let error = cursor.consume_tag("T").unwrap_err();
        assert_eq!(error.line(), Some(7));
    }

    #[test]
    fn cursor_tries_tags() {
        let mut cursor = Cursor::new("R: x : a", 2);
        assert!(!cursor.try_consume_tag(":"));
        assert_eq!(cursor.rest(), "R: x : a");
        assert!(cursor.try_consume_tag("R"));
        assert!(cursor.try_consume_tag(":"));
        assert_eq!(cursor.rest(), "x : a");
    }

    #[test]
    fn cursor_rejects_words_as_numbers() {
        let mut cursor = Cursor::new("abc 1.0", 5);
        let error = cursor.consume_float::<f64>().unwrap_err();
        assert!(matches!(error, ParseError::Numeric { line: 5, ref token } if token == "abc"));
    }

    #[test]
    fn missing_file_is_reported() {
        let error = read_source(Path::new("does/not/exist.POMDP")).unwrap_err();
        assert!(matches!(error, ParseError::FileNotFound(_)));
    }
}
