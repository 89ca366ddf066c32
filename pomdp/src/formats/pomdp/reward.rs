//! Reward blocks, filling `R[state, action]`.
//!
//! ```text
//! R: <action> : <start> : <end> : <observation> <reward>
//! R: <action> : <start> : <end>                  # row over observations
//! R: <action>                                    # one row per start state
//! ```
//!
//! Every entry assigns its value to each resolved `(start, action)` cell, and
//! later entries override earlier ones. The end state and observation fields
//! must name valid states and observations but do not select a cell.
//!
//! A matrix entry holds one line per start state, each with one value per
//! action named by the header, so `R: *` lists the whole table.

use itertools::iproduct;
use log::debug;
use ndarray::{Array1, Array2};
use num_traits::Float;

use crate::{
    formats::{header::Header, ParseError},
    space::IndexSet,
};

use super::{explicit_value, read_values, resolve, BlockLine, LineCursor, MatrixBody};

#[derive(Debug)]
enum Entry<'l> {
    Explicit {
        action: &'l str,
        start: &'l str,
        end: &'l str,
        observation: &'l str,
        tail: &'l str,
    },
    RowVector {
        action: &'l str,
        start: &'l str,
        end: &'l str,
        tail: &'l str,
    },
    Matrix { action: &'l str, tail: &'l str },
}

impl<'l> Entry<'l> {
    fn classify(line: BlockLine<'l>, number: usize) -> Result<Self, ParseError> {
        let tail = line.tail;
        match line.fields.as_slice() {
            &[action, start, end, observation] => Ok(Self::Explicit {
                action,
                start,
                end,
                observation,
                tail,
            }),
            &[action, start, end] => Ok(Self::RowVector {
                action,
                start,
                end,
                tail,
            }),
            &[action] => Ok(Self::Matrix { action, tail }),
            fields => Err(ParseError::format(
                number,
                format!("Reward entry with {} fields.", fields.len()),
            )),
        }
    }
}

pub(super) fn parse<F: Float>(
    lines: &[&str],
    blocks: &[usize],
    header: &Header<F>,
) -> Result<Array2<F>, ParseError> {
    let states = header.states.len();
    let observations = header.observations.len();
    let mut reward = Array2::zeros((states, header.actions.len()));

    for &number in blocks {
        let mut cursor = LineCursor::after(lines, number);
        let entry = Entry::classify(BlockLine::split(lines[number - 1], 'R', number)?, number)?;
        debug!("Line {number}: {entry:?}");
        match entry {
            Entry::Explicit {
                action,
                start,
                end,
                observation,
                tail,
            } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let starts = resolve(&header.states, start, "state", number)?;
                resolve(&header.states, end, "state", number)?;
                resolve(&header.observations, observation, "observation", number)?;
                let value: F = explicit_value(tail, number, &mut cursor)?;
                assign(&mut reward, &starts, &actions, value);
            }
            Entry::RowVector {
                action,
                start,
                end,
                tail,
            } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let starts = resolve(&header.states, start, "state", number)?;
                resolve(&header.states, end, "state", number)?;
                let row: Array1<F> = read_values(tail, number, observations, &mut cursor)?;
                let value = constant(&row).ok_or_else(|| {
                    ParseError::format(
                        number,
                        "Rewards are indexed by state and action and cannot vary by observation.",
                    )
                })?;
                assign(&mut reward, &starts, &actions, value);
            }
            Entry::Matrix { action, tail } => {
                let actions = resolve(&header.actions, action, "action", number)?;
                let width = actions.indices().len();
                let body: MatrixBody<F> =
                    MatrixBody::read(tail, number, (states, width), &mut cursor)?;
                let MatrixBody::Rows(matrix) = body else {
                    return Err(ParseError::format(
                        number,
                        "Reward matrices must be given row by row.",
                    ));
                };
                for (s, (column, a)) in iproduct!(0..states, actions.indices().enumerate()) {
                    reward[[s, a]] = matrix[[s, column]];
                }
            }
        }
    }

    Ok(reward)
}

fn assign<F: Float>(reward: &mut Array2<F>, starts: &IndexSet, actions: &IndexSet, value: F) {
    for (s, a) in iproduct!(starts.indices(), actions.indices()) {
        reward[[s, a]] = value;
    }
}

/// The common value of *row*, if all entries agree.
fn constant<F: Float>(row: &Array1<F>) -> Option<F> {
    let first = *row.iter().next()?;
    row.iter().all(|value| *value == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array3};

    use super::*;
    use crate::formats::pomdp::{transition, Blocks};

    const HEADER: &str = "discount: 0.9\nstates: a b\nactions: x y\nobservations: hot cold\n";

    fn reward(body: &str) -> Result<Array2<f64>, ParseError> {
        tables(body).map(|(reward, _)| reward)
    }

    fn tables(body: &str) -> Result<(Array2<f64>, Array3<f64>), ParseError> {
        let input = format!("{HEADER}{body}");
        let lines: Vec<&str> = input.lines().collect();
        let header = Header::extract(&lines)?;
        let blocks = Blocks::locate(&lines);
        let transition = transition::parse(&lines, &blocks.transition, &header)?;
        Ok((parse(&lines, &blocks.reward, &header)?, transition))
    }

    #[test]
    fn explicit_wildcards_cover_the_cross_product() {
        let r = reward("R: y : * : * : * -2.5").unwrap();
        assert_eq!(r.column(1).to_vec(), [-2.5, -2.5]);
        assert_eq!(r.column(0).to_vec(), [0.0, 0.0]);
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let r = reward("R: * : * : * : * 1\nR: x : b : * : * 10").unwrap();
        assert_eq!(r, array![[1.0, 1.0], [10.0, 1.0]]);
    }

    #[test]
    fn end_state_values_are_assigned_directly() {
        let body = "T: x\n0.5 0.5\n0.5 0.5\nO: * : * : * 1\nR: x : a : b : * 4";
        assert_eq!(reward(body).unwrap(), array![[4.0, 0.0], [0.0, 0.0]]);
    }

    #[test]
    fn values_do_not_need_transitions() {
        let r = reward("R: x : a : a : * 5\nR: y : * : b : cold 2").unwrap();
        assert_eq!(r, array![[5.0, 2.0], [0.0, 2.0]]);
    }

    #[test]
    fn row_vector_assigns_its_common_value() {
        let r = reward("R: y : b : *\n7 7").unwrap();
        assert_eq!(r, array![[0.0, 0.0], [0.0, 7.0]]);
    }

    #[test]
    fn row_vector_varying_by_observation_fails() {
        let error = reward("R: y : b : *\n10 0").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }

    #[test]
    fn matrix_rows_fill_one_action() {
        let body = "T: * uniform\nR: x\n1\n3";
        let (r, t) = tables(body).unwrap();
        assert_eq!(r, array![[1.0, 0.0], [3.0, 0.0]]);
        assert!(t.iter().all(|value| *value == 0.5));
    }

    #[test]
    fn matrix_rows_stay_out_of_transitions() {
        let (r, t) = tables("R: *\n1 2\n3 4").unwrap();
        assert_eq!(r, array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(t.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn matrix_keywords_are_rejected() {
        let error = reward("R: x\nidentity").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }

    #[test]
    fn two_fields_are_rejected() {
        let error = reward("R: x : a\n5 5\n5 5").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }

    #[test]
    fn unknown_states_fail() {
        let error = reward("R: x : c : * : * 1").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));

        let error = reward("R: x : a : c : * 1").unwrap_err();
        assert!(matches!(error, ParseError::Format { line: 5, .. }));
    }
}
