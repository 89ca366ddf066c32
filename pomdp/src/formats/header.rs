//! Header fields of the model definition format.
//!
//! The header declares the discount factor and the state, action, and
//! observation spaces:
//!
//! ```text
//! discount: 0.95
//! values: reward
//! states: tiger-left tiger-right
//! actions: listen open-left open-right
//! observations: 2
//! start: uniform
//! ```
//!
//! Each field is taken from the first line declaring it. Lines containing a
//! `#` are skipped altogether.

use log::{info, warn};
use ndarray::Array1;
use num_traits::Float;

use crate::{space::NameSpace, ValueKind};

use super::{parse_float, pomdp::block_keyword, scan_numbers, ParseError};

#[derive(Clone, Debug)]
pub struct Header<F> {
    pub discount: F,
    pub values: ValueKind,
    pub states: NameSpace,
    pub actions: NameSpace,
    pub observations: NameSpace,
    pub start: Option<Array1<F>>,
}

impl<F: Float> Header<F> {
    pub fn extract(lines: &[&str]) -> Result<Self, ParseError> {
        let discount = {
            let (line, value) =
                find_field(lines, "discount").ok_or(ParseError::MissingHeader("discount"))?;
            let token = value
                .split_whitespace()
                .next()
                .ok_or_else(|| ParseError::format(line, "Missing value for `discount:`."))?;
            parse_float::<F>(token, line)?
        };
        if discount < F::zero() || discount > F::one() {
            warn!("Discount factor is outside of [0, 1].");
        }

        let values = match find_field(lines, "values") {
            None => ValueKind::Reward,
            Some((line, value)) => match value.trim() {
                "reward" => ValueKind::Reward,
                "cost" => ValueKind::Cost,
                other => {
                    return Err(ParseError::format(
                        line,
                        format!("Expected `reward` or `cost` but found `{other}`."),
                    ));
                }
            },
        };

        let states = extract_space(lines, "states")?;
        let actions = extract_space(lines, "actions")?;
        let observations = extract_space(lines, "observations")?;

        let start = match find_field(lines, "start") {
            Some((line, value)) => Some(extract_start(lines, line, value, &states)?),
            None => None,
        };

        info!(
            "Header: {} states, {} actions, {} observations, discount {:?}.",
            states.len(),
            actions.len(),
            observations.len(),
            discount.to_f64()
        );

        Ok(Self {
            discount,
            values,
            states,
            actions,
            observations,
            start,
        })
    }
}

/// Finds the first non-comment line declaring *keyword* and returns its
/// 1-based number together with the text after the colon.
fn find_field<'l>(lines: &[&'l str], keyword: &str) -> Option<(usize, &'l str)> {
    lines.iter().enumerate().find_map(|(idx, line)| {
        if line.contains('#') {
            return None;
        }
        let value = line
            .trim_start()
            .strip_prefix(keyword)?
            .trim_start()
            .strip_prefix(':')?;
        Some((idx + 1, value))
    })
}

fn extract_space(lines: &[&str], keyword: &'static str) -> Result<NameSpace, ParseError> {
    let (line, value) = find_field(lines, keyword).ok_or(ParseError::MissingHeader(keyword))?;
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Err(ParseError::format(line, format!("Missing value for `{keyword}:`."))),
        [count] => {
            let count = count
                .parse::<usize>()
                .map_err(|_| ParseError::numeric(line, *count))?;
            if count == 0 {
                return Err(ParseError::format(line, format!("`{keyword}:` must not be empty.")));
            }
            Ok(NameSpace::synthesized(count))
        }
        names => NameSpace::named(names.iter().copied()).map_err(|name| {
            ParseError::format(line, format!("Duplicate name `{name}` in `{keyword}:`."))
        }),
    }
}

fn extract_start<F: Float>(
    lines: &[&str],
    line: usize,
    value: &str,
    states: &NameSpace,
) -> Result<Array1<F>, ParseError> {
    let size = states.len();
    let (line, value) = if value.trim().is_empty() {
        // The distribution may follow on the next non-blank line.
        lines
            .iter()
            .enumerate()
            .skip(line)
            .find(|(_, text)| !text.trim().is_empty())
            .filter(|(_, text)| block_keyword(text).is_none())
            .map(|(idx, text)| (idx + 1, *text))
            .ok_or_else(|| ParseError::format(line, "Missing value for `start:`."))?
    } else {
        (line, value)
    };
    let value = value.trim();

    if value == "uniform" {
        return Ok(Array1::from_elem(size, uniform(size)));
    }
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if let [single] = tokens.as_slice() {
        if let Some(state) = states.resolve(single).filter(|set| !set.is_all()) {
            let mut belief = Array1::zeros(size);
            for idx in state.indices() {
                belief[idx] = F::one();
            }
            return Ok(belief);
        }
    }
    let numbers: Vec<&str> = scan_numbers(value).collect();
    if numbers.len() != size {
        return Err(ParseError::format(
            line,
            format!("Expected {size} start probabilities but found {}.", numbers.len()),
        ));
    }
    numbers
        .into_iter()
        .map(|token| parse_float(token, line))
        .collect()
}

pub(crate) fn uniform<F: Float>(size: usize) -> F {
    F::one() / F::from(size).unwrap_or_else(F::infinity)
}
