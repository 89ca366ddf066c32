//! Transition blocks, filling `T[state, action, next_state]`.

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
    /// `T: <action> : <start> : <end> <probability>`
    Explicit {
        action: &'l str,
        start: &'l str,
        end: &'l str,
        tail: &'l str,
    },
    /// `T: <action> : <start>` followed by a row over end states.
    RowVector {
        action: &'l str,
        start: &'l str,
        tail: &'l str,
    },
    /// `T: <action>` followed by `identity`, `uniform`, or a matrix.
    Matrix { action: &'l str, tail: &'l str },
}

impl<'l> Entry<'l> {
    fn classify(line: BlockLine<'l>, number: usize) -> Result<Self, ParseError> {
        let tail = line.tail;
        match line.fields.as_slice() {
            &[action, start, end] => Ok(Self::Explicit {
                action,
                start,
                end,
                tail,
            }),
            &[action, start] => Ok(Self::RowVector {
                action,
                start,
                tail,
            }),
            &[action] => Ok(Self::Matrix { action, tail }),
            fields => Err(ParseError::format(
                number,
                format!("Transition entry with {} fields.", fields.len()),
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
    let mut transition = Array3::zeros((states, header.actions.len(), states));

    for &number in blocks {
        let mut cursor = LineCursor::after(lines, number);
        let entry = Entry::classify(BlockLine::split(lines[number - 1], 'T', number)?, number)?;
        debug!("Line {number}: {entry:?}");
        match entry {
            Entry::Explicit {
                action,
                start,
                end,
                tail,
            } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let starts = resolve(&header.states, start, "state", number)?;
                let ends = resolve(&header.states, end, "state", number)?;
                let value: F = explicit_value(tail, number, &mut cursor)?;
                for (s, a, e) in iproduct!(starts.indices(), actions.indices(), ends.indices()) {
                    transition[[s, a, e]] = value;
                }
            }
            Entry::RowVector {
                action,
                start,
                tail,
            } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let starts = resolve(&header.states, start, "state", number)?;
                let row: Array1<F> = read_distribution(tail, number, states, &mut cursor)?;
                for (s, a) in iproduct!(starts.indices(), actions.indices()) {
                    transition.slice_mut(s![s, a, ..]).assign(&row);
                }
            }
            Entry::Matrix { action, tail } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let body: MatrixBody<F> =
                    MatrixBody::read(tail, number, (states, states), &mut cursor)?;
                for a in actions.indices() {
                    let mut slice = transition.slice_mut(s![.., a, ..]);
                    match &body {
                        MatrixBody::Identity => {
                            slice.fill(F::zero());
                            slice.diag_mut().fill(F::one());
                        }
                        MatrixBody::Uniform => slice.fill(uniform(states)),
                        MatrixBody::Rows(matrix) => slice.assign(matrix),
                    }
                }
            }
        }
    }

    Ok(transition)
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    const HEADER: &str = "discount: 0.9\nstates: a b c\nactions: x y\nobservations: 1\n";

    fn transition(body: &str) -> Result<Array3<f64>, ParseError> {
        let input = format!("{HEADER}{body}");
        let lines: Vec<&str> = input.lines().collect();
        let header = Header::extract(&lines)?;
        let blocks = super::super::Blocks::locate(&lines);
        parse(&lines, &blocks.transition, &header)
    }

    #[test]
    fn explicit_wildcards_cover_the_cross_product() {
        let t = transition("T: x : * : b 0.5").unwrap();
        for ((s, a, e), value) in t.indexed_iter() {
            let expected = if a == 0 && e == 1 { 0.5 } else { 0.0 };
            assert_eq!(*value, expected, "T[{s}, {a}, {e}]");
        }
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let t = transition("T: * : * : * 0.25\nT: y : c : a 1.0").unwrap();
        assert_eq!(t[[2, 1, 0]], 1.0);
        assert_eq!(t[[2, 1, 1]], 0.25);
        assert_eq!(t[[2, 0, 0]], 0.25);
    }

    #[test]
    fn explicit_value_on_next_line() {
        let t = transition("T: 0 : 1 : 2\n0.75").unwrap();
        assert_eq!(t[[1, 0, 2]], 0.75);
    }

    #[test]
    fn row_vector_fills_end_states() {
        let t = transition("T: y : b\n0.1 0.2 0.7\nT: x : *\nuniform").unwrap();
        assert_eq!(t.slice(s![1, 1, ..]).to_vec(), [0.1, 0.2, 0.7]);
        for s in 0..3 {
            assert_eq!(t.slice(s![s, 0, ..]).to_vec(), [1.0 / 3.0; 3]);
        }
    }

    #[test]
    fn identity_matrix() {
        let t = transition("T: * : * : * 0.5\nT: x\nidentity").unwrap();
        assert_eq!(t.slice(s![.., 0, ..]), Array2::<f64>::eye(3));
        assert_eq!(t[[0, 1, 1]], 0.5);
    }

    #[test]
    fn uniform_matrix_rows_sum_to_one() {
        let t = transition("T: y uniform").unwrap();
        for row in t.slice(s![.., 1, ..]).rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|value| *value == row[0]));
        }
    }

    #[test]
    fn matrix_rows_follow_state_order() {
        let t = transition("T: x\n1 0 0\n0.5 0.5 0\n# last row\n0 0 1").unwrap();
        assert_eq!(t.slice(s![1, 0, ..]).to_vec(), [0.5, 0.5, 0.0]);
        assert_eq!(t.slice(s![2, 0, ..]).to_vec(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn unknown_names_fail() {
        let error = transition("T: x : d : a 1.0").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }

    #[test]
    fn short_rows_fail() {
        let error = transition("T: x : a\n0.5 0.5").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 6, .. }));
    }

    #[test]
    fn truncated_matrix_fails() {
        let error = transition("T: x\n1 0 0\n0 1 0").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 7, .. }));
    }
}
