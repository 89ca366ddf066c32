//! Observation blocks, filling `O[observation, action, next_state]`.

use itertools::iproduct;
use log::debug;
use ndarray::{s, Array1, Array3};
use num_traits::Float;

use crate::formats::{header::Header, ParseError};

use super::{
    explicit_value, read_distribution, resolve, uniform, BlockLine, LineCursor, MatrixBody,
};

#[derive(Debug)]
enum Entry<'l> {
    /// `O: <action> : <end> : <observation> <probability>`
    Explicit {
        action: &'l str,
        end: &'l str,
        observation: &'l str,
        tail: &'l str,
    },
    /// `O: <action> : <end>` followed by a row over observations.
    RowVector {
        action: &'l str,
        end: &'l str,
        tail: &'l str,
    },
    /// `O: <action>` followed by `identity`, `uniform`, or one row per end state.
    Matrix { action: &'l str, tail: &'l str },
}

impl<'l> Entry<'l> {
    fn classify(line: BlockLine<'l>, number: usize) -> Result<Self, ParseError> {
        let tail = line.tail;
        match line.fields.as_slice() {
            &[action, end, observation] => Ok(Self::Explicit {
                action,
                end,
                observation,
                tail,
            }),
            &[action, end] => Ok(Self::RowVector { action, end, tail }),
            &[action] => Ok(Self::Matrix { action, tail }),
            fields => Err(ParseError::format(
                number,
                format!("Observation entry with {} fields.", fields.len()),
            )),
        }
    }
}

pub(super) fn parse<F: Float>(
    lines: &[&str],
    blocks: &[usize],
    header: &Header<F>,
) -> Result<Array3<F>, ParseError> {
    let states = header.states.len();
    let observations = header.observations.len();
    let mut observation = Array3::zeros((observations, header.actions.len(), states));

    for &number in blocks {
        let mut cursor = LineCursor::after(lines, number);
        let entry = Entry::classify(BlockLine::split(lines[number - 1], 'O', number)?, number)?;
        debug!("Line {number}: {entry:?}");
        match entry {
            Entry::Explicit {
                action,
                end,
                observation: field,
                tail,
            } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let ends = resolve(&header.states, end, "state", number)?;
                let emitted = resolve(&header.observations, field, "observation", number)?;
                let value: F = explicit_value(tail, number, &mut cursor)?;
                for (o, a, e) in iproduct!(emitted.indices(), actions.indices(), ends.indices()) {
                    observation[[o, a, e]] = value;
                }
            }
            Entry::RowVector { action, end, tail } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let ends = resolve(&header.states, end, "state", number)?;
                let row: Array1<F> =
                    read_distribution(tail, number, observations, &mut cursor)?;
                for (a, e) in iproduct!(actions.indices(), ends.indices()) {
                    observation.slice_mut(s![.., a, e]).assign(&row);
                }
            }
            Entry::Matrix { action, tail } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let body: MatrixBody<F> =
                    MatrixBody::read(tail, number, (states, observations), &mut cursor)?;
                if matches!(body, MatrixBody::Identity) && observations != states {
                    return Err(ParseError::format(
                        number,
                        format!(
                            "`identity` needs as many observations as states ({observations} != {states})."
                        ),
                    ));
                }
                for a in actions.indices() {
                    // Rows of the body are end states, the slice is indexed by observation first.
                    let mut slice = observation.slice_mut(s![.., a, ..]);
                    match &body {
                        MatrixBody::Identity => {
                            slice.fill(F::zero());
                            slice.diag_mut().fill(F::one());
                        }
                        MatrixBody::Uniform => slice.fill(uniform(observations)),
                        MatrixBody::Rows(matrix) => slice.assign(&matrix.t()),
                    }
                }
            }
        }
    }

    Ok(observation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "discount: 0.9\nstates: a b\nactions: x y\nobservations: hot cold warm\n";

    fn observation(body: &str) -> Result<Array3<f64>, ParseError> {
        let input = format!("{HEADER}{body}");
        let lines: Vec<&str> = input.lines().collect();
        let header = Header::extract(&lines)?;
        let blocks = super::super::Blocks::locate(&lines);
        parse(&lines, &blocks.observation, &header)
    }

    #[test]
    fn explicit_wildcards_cover_the_cross_product() {
        let o = observation("O: * : b : cold 0.8").unwrap();
        for ((obs, a, e), value) in o.indexed_iter() {
            let expected = if obs == 1 && e == 1 { 0.8 } else { 0.0 };
            assert_eq!(*value, expected, "O[{obs}, {a}, {e}]");
        }
    }

    #[test]
    fn row_vector_fills_observations() {
        let o = observation("O: y : a\n0.2 0.3 0.5").unwrap();
        assert_eq!(o.slice(s![.., 1, 0]).to_vec(), [0.2, 0.3, 0.5]);
        assert_eq!(o.slice(s![.., 0, 0]).to_vec(), [0.0; 3]);
    }

    #[test]
    fn matrix_rows_are_end_states() {
        let o = observation("O: x\n0.1 0.2 0.7\n0.6 0.3 0.1").unwrap();
        assert_eq!(o.slice(s![.., 0, 0]).to_vec(), [0.1, 0.2, 0.7]);
        assert_eq!(o.slice(s![.., 0, 1]).to_vec(), [0.6, 0.3, 0.1]);
    }

    #[test]
    fn uniform_matrix() {
        let o = observation("O: *\nuniform").unwrap();
        for (a, e) in iproduct!(0..2usize, 0..2usize) {
            let column = o.slice(s![.., a, e]);
            assert!((column.sum() - 1.0).abs() < 1e-12);
            assert!(column.iter().all(|value| *value == column[0]));
        }
    }

    #[test]
    fn identity_requires_square_tables() {
        let error = observation("O: x identity").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }

    #[test]
    fn unknown_observation_fails() {
        let error = observation("O: x : a : freezing 1.0").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }
}
