//! Stationary distributions of irreducible and reducible chains.

use ndarray::{Array1, Array2, ArrayView1};

use crate::classes::{Classification, classify_chain};
use crate::error::MarkovError;
use crate::linalg::stationary_vector;
use crate::transition::TransitionMatrix;

/// Stationary distribution(s) of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SteadyState {
    /// Single communicating class: one distribution over all states.
    Ergodic(Array1<f64>),
    /// One row per recurrent class (`r x k`), zero outside the class.
    Decomposed(Array2<f64>),
}

impl SteadyState {
    /// Returns `true` for the single-distribution case.
    pub fn is_ergodic(&self) -> bool {
        matches!(self, Self::Ergodic(_))
    }

    /// The distribution of an ergodic chain.
    pub fn as_ergodic(&self) -> Option<&Array1<f64>> {
        match self {
            Self::Ergodic(pi) => Some(pi),
            Self::Decomposed(_) => None,
        }
    }

    /// Number of distributions.
    pub fn len(&self) -> usize {
        match self {
            Self::Ergodic(_) => 1,
            Self::Decomposed(rows) => rows.nrows(),
        }
    }

    /// Always `false`; a chain has at least one recurrent class.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distribution `i` as a view over all states.
    pub fn distribution(&self, i: usize) -> Option<ArrayView1<'_, f64>> {
        match self {
            Self::Ergodic(pi) if i == 0 => Some(pi.view()),
            Self::Ergodic(_) => None,
            Self::Decomposed(rows) if i < rows.nrows() => Some(rows.row(i)),
            Self::Decomposed(_) => None,
        }
    }
}

/// Stationary distribution(s) of `p`.
///
/// # Errors
///
/// Returns [`MarkovError::UnnormalizableMatrix`] if `p` has zero rows and
/// `fill_empty_classes` is false.
pub fn steady_state(p: &TransitionMatrix, fill_empty_classes: bool) -> Result<SteadyState, MarkovError> {
    let p = p.require_stochastic(fill_empty_classes)?;
    let classification = classify_chain(&p)?;
    steady_state_with(&p, &classification)
}

/// Stationary distribution(s) of a stochastic `p` with a known decomposition.
///
/// Each recurrent class has no outflow, so its submatrix is itself
/// stochastic and irreducible.
pub fn steady_state_with(
    p: &TransitionMatrix,
    classification: &Classification,
) -> Result<SteadyState, MarkovError> {
    if classification.is_irreducible() {
        return Ok(SteadyState::Ergodic(stationary_vector(p.probs())?));
    }
    let recurrent: Vec<_> = classification.recurrent().collect();
    let mut rows = Array2::zeros((recurrent.len(), p.k()));
    for (r, class) in recurrent.iter().enumerate() {
        let sub = p.submatrix(class.states());
        let pi = stationary_vector(sub.probs())?;
        for (&state, &mass) in class.states().iter().zip(pi.iter()) {
            rows[[r, state]] = mass;
        }
    }
    Ok(SteadyState::Decomposed(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn ergodic_weather_chain() {
        let p = TransitionMatrix::new(array![
            [0.5, 0.25, 0.25],
            [0.5, 0.0, 0.5],
            [0.25, 0.25, 0.5]
        ])
        .unwrap();
        let ss = steady_state(&p, false).unwrap();
        let pi = ss.as_ergodic().unwrap();
        assert_abs_diff_eq!(pi[0], 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(pi[1], 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(pi[2], 0.4, epsilon = 1e-9);
    }

    #[test]
    fn reducible_chain_gives_one_row_per_recurrent_class() {
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.2, 0.8, 0.0], [0.0, 0.0, 1.0]])
            .unwrap();
        let ss = steady_state(&p, false).unwrap();
        let SteadyState::Decomposed(rows) = ss else {
            panic!("expected decomposed steady state");
        };
        assert_eq!(rows.dim(), (2, 3));
        assert_abs_diff_eq!(rows[[0, 0]], 2.0 / 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rows[[0, 1]], 5.0 / 7.0, epsilon = 1e-9);
        assert_eq!(rows[[0, 2]], 0.0);
        assert_eq!(rows.row(1).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_row_needs_fill() {
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.3, 0.7, 0.0], [0.0, 0.0, 0.0]])
            .unwrap();
        assert!(matches!(
            steady_state(&p, false),
            Err(MarkovError::UnnormalizableMatrix { rows: 1 })
        ));
        let ss = steady_state(&p, true).unwrap();
        assert_eq!(ss.len(), 2);
        let first = ss.distribution(0).unwrap();
        assert_abs_diff_eq!(first[0], 0.375, epsilon = 1e-9);
        assert_abs_diff_eq!(first[1], 0.625, epsilon = 1e-9);
        assert!(ss.distribution(2).is_none());
    }

    #[test]
    fn transient_states_get_no_mass() {
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.0, 0.5, 0.5], [0.0, 0.5, 0.5]])
            .unwrap();
        let ss = steady_state(&p, false).unwrap();
        let row = ss.distribution(0).unwrap();
        assert_eq!(ss.len(), 1);
        assert_eq!(row[0], 0.0);
        assert_abs_diff_eq!(row[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(row[2], 0.5, epsilon = 1e-9);
    }
}
