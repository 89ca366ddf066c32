//! Readers for POMDP model definitions and alpha-vector value functions.
//!
//! A model definition is read into a [`Model`] holding the transition tensor
//! $T$, the observation tensor $O$, the reward matrix $R$, and the discount
//! factor:
//!
//! ```no_run
//! let model = pomdp::read_model("tiger.95.POMDP")?;
//! let (coefficients, actions) = pomdp::read_alpha("tiger.95.alpha")?;
//! assert_eq!(coefficients.nrows(), model.states().len());
//! # Ok::<(), pomdp::formats::ParseError>(())
//! ```

pub mod formats;
pub mod space;

use std::{fmt::Display, path::Path};

use ndarray::{Array1, Array2, Array3, Axis};
use num_traits::Float;

use formats::ParseError;
use space::NameSpace;

pub use formats::alpha::AlphaVectors;

/// Whether the reward table holds rewards or costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueKind {
    #[default]
    Reward,
    Cost,
}

/// A consumer of the assembled tables.
pub trait FromTables<F>: Sized {
    /// Builds `Self` from $T[s, a, s']$, $R[s, a]$, $O[o, a, s']$, and the discount.
    fn from_tables(
        transition: Array3<F>,
        reward: Array2<F>,
        observation: Array3<F>,
        discount: F,
    ) -> Self;
}

impl<F> FromTables<F> for (Array3<F>, Array2<F>, Array3<F>, F) {
    fn from_tables(
        transition: Array3<F>,
        reward: Array2<F>,
        observation: Array3<F>,
        discount: F,
    ) -> Self {
        (transition, reward, observation, discount)
    }
}

/// A POMDP model as read from a model definition.
#[derive(Clone, Debug)]
pub struct Model<F> {
    pub(crate) transition: Array3<F>,
    pub(crate) observation: Array3<F>,
    pub(crate) reward: Array2<F>,
    pub(crate) discount: F,
    pub(crate) values: ValueKind,
    pub(crate) states: NameSpace,
    pub(crate) actions: NameSpace,
    pub(crate) observations: NameSpace,
    pub(crate) start: Option<Array1<F>>,
}

impl<F: Float> Model<F> {
    /// The transition tensor indexed by `[state, action, next_state]`.
    pub fn transition(&self) -> &Array3<F> {
        &self.transition
    }

    /// The observation tensor indexed by `[observation, action, next_state]`.
    pub fn observation(&self) -> &Array3<F> {
        &self.observation
    }

    /// The immediate reward indexed by `[state, action]`.
    pub fn reward(&self) -> &Array2<F> {
        &self.reward
    }

    pub fn discount(&self) -> F {
        self.discount
    }

    pub fn value_kind(&self) -> ValueKind {
        self.values
    }

    pub fn states(&self) -> &NameSpace {
        &self.states
    }

    pub fn actions(&self) -> &NameSpace {
        &self.actions
    }

    pub fn observations(&self) -> &NameSpace {
        &self.observations
    }

    /// The initial belief, if the model declares one.
    pub fn start(&self) -> Option<&Array1<F>> {
        self.start.as_ref()
    }

    /// Hands the tables over to a consumer.
    pub fn into_tables<C: FromTables<F>>(self) -> C {
        C::from_tables(self.transition, self.reward, self.observation, self.discount)
    }

    /// Returns the first distribution that does not sum to one within
    /// *tolerance*.
    ///
    /// Rows $T[s, a, \cdot]$ are checked before columns $O[\cdot, a, s']$.
    pub fn check_stochastic(&self, tolerance: F) -> Option<Violation<F>> {
        let deviates = |sum: F| (sum - F::one()).abs() > tolerance;
        let transition = self
            .transition
            .sum_axis(Axis(2))
            .indexed_iter()
            .find(|(_, sum)| deviates(**sum))
            .map(|((state, action), sum)| Violation {
                table: Table::Transition,
                action,
                state,
                sum: *sum,
            });
        transition.or_else(|| {
            self.observation
                .sum_axis(Axis(0))
                .indexed_iter()
                .find(|(_, sum)| deviates(**sum))
                .map(|((action, state), sum)| Violation {
                    table: Table::Observation,
                    action,
                    state,
                    sum: *sum,
                })
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    Transition,
    Observation,
}

/// A distribution of a model that does not sum to one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Violation<F> {
    pub table: Table,
    pub action: usize,
    /// The start state for transitions, the end state for observations.
    pub state: usize,
    pub sum: F,
}

impl<F: Float> Display for Violation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sum = self.sum.to_f64().unwrap_or(f64::NAN);
        match self.table {
            Table::Transition => write!(
                f,
                "Transition probabilities of state {} under action {} sum to {sum}.",
                self.state, self.action
            ),
            Table::Observation => write!(
                f,
                "Observation probabilities of end state {} under action {} sum to {sum}.",
                self.state, self.action
            ),
        }
    }
}

/// Reads the model definition file at *path*.
pub fn read_model(path: impl AsRef<Path>) -> Result<Model<f64>, ParseError> {
    formats::pomdp::read(path.as_ref())
}

/// Parses a model definition.
pub fn parse_model(input: &str) -> Result<Model<f64>, ParseError> {
    formats::pomdp::parse(input)
}

/// Reads the alpha-vector file at *path*.
///
/// Returns the coefficient matrix, one column per vector, and the action
/// index of every vector.
pub fn read_alpha(path: impl AsRef<Path>) -> Result<(Array2<f64>, Vec<usize>), ParseError> {
    formats::alpha::read(path.as_ref()).map(AlphaVectors::into_parts)
}

/// Parses alpha vectors, see [`read_alpha`].
pub fn parse_alpha(input: &str) -> Result<(Array2<f64>, Vec<usize>), ParseError> {
    formats::alpha::parse(input).map(AlphaVectors::into_parts)
}
