//! The POMDP model definition format.
//!
//! After the [header](super::header), a model file consists of blocks
//! describing the transition (`T:`), observation (`O:`), and reward (`R:`)
//! tables. Each block comes in one of three styles:
//!
//! ```text
//! T: listen : tiger-left : tiger-left 1.0     # explicit entry
//! T: listen : tiger-left                      # row vector
//! 1.0 0.0
//! T: listen                                   # matrix
//! identity
//! ```
//!
//! Every field may name an element, give its 0-based index, or be `*` for
//! all elements. Later entries override earlier ones.

use std::path::Path;

use log::{info, warn};
use ndarray::{Array1, Array2};
use num_traits::Float;

use crate::{space::IndexSet, space::NameSpace, Model};

use super::{
    header::{uniform, Header},
    parse_float, read_source, scan_numbers, strip_comment, Cursor, ParseError,
};

mod observation;
mod reward;
mod transition;

/// Reads a model definition file.
pub fn read<F: Float>(path: &Path) -> Result<Model<F>, ParseError> {
    let source = read_source(path)?;
    info!("Parsing model definition `{}`.", path.display());
    parse(&source)
}

/// Parses a model definition.
pub fn parse<F: Float>(input: &str) -> Result<Model<F>, ParseError> {
    let lines: Vec<&str> = input.lines().collect();
    let header = Header::<F>::extract(&lines)?;
    let blocks = Blocks::locate(&lines);
    info!(
        "Located {} transition, {} observation, and {} reward blocks.",
        blocks.transition.len(),
        blocks.observation.len(),
        blocks.reward.len()
    );

    let transition = transition::parse(&lines, &blocks.transition, &header)?;
    let observation = observation::parse(&lines, &blocks.observation, &header)?;
    let reward = reward::parse(&lines, &blocks.reward, &header)?;

    let model = Model {
        transition,
        observation,
        reward,
        discount: header.discount,
        values: header.values,
        states: header.states,
        actions: header.actions,
        observations: header.observations,
        start: header.start,
    };
    if let Some(violation) = model.check_stochastic(F::from(1e-6).unwrap_or_else(F::epsilon)) {
        warn!("{violation}");
    }
    Ok(model)
}

/// Returns the table keyword if *line* starts a block.
pub(crate) fn block_keyword(line: &str) -> Option<char> {
    let mut chars = line.trim_start().chars();
    let keyword = chars.next().filter(|c| matches!(c, 'T' | 'O' | 'R'))?;
    chars
        .as_str()
        .trim_start()
        .starts_with(':')
        .then_some(keyword)
}

/// The 1-based line numbers of all block starts, per table.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Blocks {
    pub transition: Vec<usize>,
    pub observation: Vec<usize>,
    pub reward: Vec<usize>,
}

impl Blocks {
    pub fn locate(lines: &[&str]) -> Self {
        let mut blocks = Self::default();
        for (idx, line) in lines.iter().enumerate() {
            match block_keyword(line) {
                Some('T') => blocks.transition.push(idx + 1),
                Some('O') => blocks.observation.push(idx + 1),
                Some('R') => blocks.reward.push(idx + 1),
                _ => {}
            }
        }
        blocks
    }
}

/// A block start split into its `:`-separated fields and the remaining text.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct BlockLine<'l> {
    pub fields: Vec<&'l str>,
    pub tail: &'l str,
}

impl<'l> BlockLine<'l> {
    pub fn split(line: &'l str, keyword: char, number: usize) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(strip_comment(line), number);
        cursor.consume_tag(keyword.to_string())?;
        cursor.consume_tag(":")?;
        let mut fields = vec![cursor.consume_field()?];
        while cursor.try_consume_tag(":") {
            fields.push(cursor.consume_field()?);
        }
        Ok(Self {
            fields,
            tail: cursor.rest(),
        })
    }
}

/// Reads the lines following a single block start.
///
/// Blank lines and comments are skipped. Reaching the start of another block
/// or the end of the input is an error.
#[derive(Clone, Debug)]
pub(crate) struct LineCursor<'l> {
    lines: &'l [&'l str],
    next: usize,
}

impl<'l> LineCursor<'l> {
    /// Positions the cursor after the block starting at 1-based line *start*.
    pub fn after(lines: &'l [&'l str], start: usize) -> Self {
        Self { lines, next: start }
    }

    pub fn next_line(&mut self, expected: &str) -> Result<(usize, &'l str), ParseError> {
        let lines = self.lines;
        while let Some(line) = lines.get(self.next) {
            self.next += 1;
            let content = strip_comment(line).trim();
            if content.is_empty() {
                continue;
            }
            if block_keyword(content).is_some() {
                return Err(ParseError::format(
                    self.next,
                    format!("Expected {expected} but found the start of another block."),
                ));
            }
            return Ok((self.next, content));
        }
        Err(ParseError::format(
            lines.len(),
            format!("Expected {expected} but reached the end of the file."),
        ))
    }

    pub fn peek_line(&self) -> Option<&'l str> {
        self.clone().next_line("").ok().map(|(_, line)| line)
    }
}

pub(crate) fn resolve(
    space: &NameSpace,
    field: &str,
    what: &str,
    line: usize,
) -> Result<IndexSet, ParseError> {
    space
        .resolve(field)
        .ok_or_else(|| ParseError::format(line, format!("Unknown {what} `{field}`.")))
}

/// The value of an explicit entry, either after its last field or on the
/// following line.
pub(crate) fn explicit_value<F: Float>(
    tail: &str,
    line: usize,
    cursor: &mut LineCursor,
) -> Result<F, ParseError> {
    if tail.is_empty() {
        let (line, text) = cursor.next_line("a value")?;
        let token = scan_numbers(text)
            .next()
            .ok_or_else(|| ParseError::numeric(line, text))?;
        parse_float(token, line)
    } else {
        let mut value = Cursor::new(tail, line);
        let result = value.consume_float()?;
        if !value.is_empty() {
            return Err(ParseError::format(
                line,
                format!("Unexpected `{}` after value.", value.rest()),
            ));
        }
        Ok(result)
    }
}

/// Reads exactly *size* values from *text*.
pub(crate) fn parse_values<F: Float>(
    text: &str,
    size: usize,
    line: usize,
) -> Result<Array1<F>, ParseError> {
    let tokens: Vec<&str> = scan_numbers(text).collect();
    if tokens.len() != size {
        return Err(ParseError::format(
            line,
            format!("Expected {size} values but found {}.", tokens.len()),
        ));
    }
    tokens
        .into_iter()
        .map(|token| parse_float(token, line))
        .collect()
}

/// Reads a row of *size* values, from *tail* if the block start carries it.
pub(crate) fn read_values<F: Float>(
    tail: &str,
    line: usize,
    size: usize,
    cursor: &mut LineCursor,
) -> Result<Array1<F>, ParseError> {
    if tail.is_empty() {
        let (line, text) = cursor.next_line("a row of values")?;
        parse_values(text, size, line)
    } else {
        parse_values(tail, size, line)
    }
}

/// Like [`read_values`] but additionally accepts `uniform`.
pub(crate) fn read_distribution<F: Float>(
    tail: &str,
    line: usize,
    size: usize,
    cursor: &mut LineCursor,
) -> Result<Array1<F>, ParseError> {
    let is_uniform = if tail.is_empty() {
        cursor.peek_line() == Some("uniform")
    } else {
        tail == "uniform"
    };
    if is_uniform {
        if tail.is_empty() {
            cursor.next_line("uniform")?;
        }
        Ok(Array1::from_elem(size, uniform(size)))
    } else {
        read_values(tail, line, size, cursor)
    }
}

/// The body of a matrix-style block.
#[derive(Debug)]
pub(crate) enum MatrixBody<F> {
    Identity,
    Uniform,
    Rows(Array2<F>),
}

impl<F: Float> MatrixBody<F> {
    /// Reads the body of a matrix block with *rows* lines of *columns* values.
    pub fn read(
        tail: &str,
        line: usize,
        (rows, columns): (usize, usize),
        cursor: &mut LineCursor,
    ) -> Result<Self, ParseError> {
        let keyword = if tail.is_empty() {
            cursor.peek_line()
        } else {
            Some(tail)
        };
        let body = match keyword {
            Some("identity") => Self::Identity,
            Some("uniform") => Self::Uniform,
            _ if !tail.is_empty() => {
                return Err(ParseError::format(
                    line,
                    format!("Expected `identity`, `uniform`, or a new line but found `{tail}`."),
                ));
            }
            _ => {
                let mut matrix = Array2::zeros((rows, columns));
                for row in 0..rows {
                    let (line, text) = cursor.next_line("a matrix row")?;
                    matrix.row_mut(row).assign(&parse_values(text, columns, line)?);
                }
                return Ok(Self::Rows(matrix));
            }
        };
        if tail.is_empty() {
            cursor.next_line("a matrix keyword")?;
        }
        Ok(body)
    }
}
