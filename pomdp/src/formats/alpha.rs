//! The alpha-vector value-function format.
//!
//! A value function is a list of alpha vectors, each preceded by the 0-based
//! index of the action it belongs to:
//!
//! ```text
//! 0
//! -81.5975 3.5268
//!
//! 2
//! 3.5268 -81.5975
//! ```

use std::path::Path;

use log::{debug, info};
use ndarray::{Array2, ArrayView1, Axis};
use num_traits::Float;

use super::{parse_float, read_source, scan_numbers, ParseError};

/// Alpha vectors stored as the columns of a coefficient matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaVectors<F> {
    coefficients: Array2<F>,
    actions: Vec<usize>,
}

impl<F: Float> AlphaVectors<F> {
    /// The number of alpha vectors.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The number of coefficients of each vector.
    pub fn vector_len(&self) -> usize {
        self.coefficients.nrows()
    }

    /// The `vector_len × len` coefficient matrix.
    pub fn coefficients(&self) -> &Array2<F> {
        &self.coefficients
    }

    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    /// Returns the action of the alpha vector *idx*.
    ///
    /// # Panics
    ///
    /// Panics if the access is out-of-bounds.
    pub fn action(&self, idx: usize) -> usize {
        self.actions[idx]
    }

    /// Returns the alpha vector *idx*.
    ///
    /// # Panics
    ///
    /// Panics if the access is out-of-bounds.
    pub fn vector(&self, idx: usize) -> ArrayView1<F> {
        self.coefficients.column(idx)
    }

    /// Evaluates the value function at *belief*.
    ///
    /// Returns the action of the maximizing vector together with the value,
    /// or `None` if there are no vectors.
    ///
    /// # Panics
    ///
    /// Panics if the belief does not have [`vector_len`](Self::vector_len) entries.
    pub fn best(&self, belief: ArrayView1<F>) -> Option<(usize, F)> {
        assert!(
            belief.len() == self.vector_len(),
            "Belief has {} entries but alpha vectors have {}.",
            belief.len(),
            self.vector_len()
        );
        self.coefficients
            .axis_iter(Axis(1))
            .zip(&self.actions)
            .map(|(vector, action)| {
                let value = vector
                    .iter()
                    .zip(belief.iter())
                    .fold(F::zero(), |sum, (alpha, b)| sum + *alpha * *b);
                (*action, value)
            })
            .fold(None, |best, (action, value)| match best {
                Some((_, current)) if current >= value => best,
                _ => Some((action, value)),
            })
    }

    pub fn into_parts(self) -> (Array2<F>, Vec<usize>) {
        (self.coefficients, self.actions)
    }
}

/// Reads an alpha-vector file.
pub fn read<F: Float>(path: &Path) -> Result<AlphaVectors<F>, ParseError> {
    let source = read_source(path)?;
    info!("Parsing alpha vectors `{}`.", path.display());
    parse(&source)
}

/// Parses alpha vectors.
///
/// Every line with more than one number is a vector. The line directly
/// before it must hold the action index and nothing else. The first vector
/// fixes the length of all others.
pub fn parse<F: Float>(input: &str) -> Result<AlphaVectors<F>, ParseError> {
    let lines: Vec<&str> = input.lines().collect();
    let mut vectors: Vec<Vec<F>> = Vec::new();
    let mut actions = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = scan_numbers(line).collect();
        if tokens.len() <= 1 {
            continue;
        }
        let number = idx + 1;

        let action = idx
            .checked_sub(1)
            .map(|previous| lines[previous].trim())
            .filter(|text| !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| {
                ParseError::format(number, "Alpha vector is not preceded by an action index.")
            })?;
        let action = action
            .parse::<usize>()
            .map_err(|_| ParseError::numeric(number - 1, action))?;

        if let Some(expected) = vectors.first().map(Vec::len) {
            if tokens.len() != expected {
                return Err(ParseError::format(
                    number,
                    format!(
                        "Expected {expected} coefficients but found {}.",
                        tokens.len()
                    ),
                ));
            }
        }

        let vector = tokens
            .into_iter()
            .map(|token| parse_float(token, number))
            .collect::<Result<Vec<F>, _>>()?;
        debug!("Line {number}: alpha vector for action {action}.");
        vectors.push(vector);
        actions.push(action);
    }

    let length = vectors.first().map_or(0, Vec::len);
    let coefficients = Array2::from_shape_fn((length, vectors.len()), |(component, column)| {
        vectors[column][component]
    });
    info!(
        "Parsed {} alpha vectors of length {}.",
        vectors.len(),
        length
    );

    Ok(AlphaVectors {
        coefficients,
        actions,
    })
}
