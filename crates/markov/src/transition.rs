//! Transition counting and row-stochastic transition matrices.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::debug;

use crate::error::MarkovError;
use crate::state::StateSpace;

/// Tolerance used when checking that a row sums to 1.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A `k x k` transition matrix whose rows each sum to 1 or to 0.
///
/// Zero rows stand for states never observed as an origin. Solvers that
/// need a proper stochastic matrix go through
/// [`require_stochastic`](Self::require_stochastic), which either repairs
/// those rows or rejects the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    probs: Array2<f64>,
}

impl TransitionMatrix {
    /// Wraps a probability matrix after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError`] if the matrix is not square, has a negative or
    /// non-finite entry, or has a row summing to neither 0 nor 1.
    pub fn new(probs: Array2<f64>) -> Result<Self, MarkovError> {
        check_entries(&probs.view())?;
        for (row, r) in probs.axis_iter(Axis(0)).enumerate() {
            let sum = r.sum();
            if sum != 0.0 && (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(MarkovError::MalformedMatrix { row, sum });
            }
        }
        Ok(Self { probs })
    }

    /// Row-normalizes a count matrix. Rows without counts stay zero.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError`] if the counts are not square, negative or
    /// non-finite.
    pub fn from_counts(counts: &Array2<f64>) -> Result<Self, MarkovError> {
        check_entries(&counts.view())?;
        let mut probs = counts.clone();
        for mut row in probs.axis_iter_mut(Axis(0)) {
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|c| c / sum);
            }
        }
        Ok(Self { probs })
    }

    /// Number of states.
    pub fn k(&self) -> usize {
        self.probs.nrows()
    }

    /// The probability matrix.
    pub fn probs(&self) -> &Array2<f64> {
        &self.probs
    }

    /// Consumes the wrapper and returns the probability matrix.
    pub fn into_inner(self) -> Array2<f64> {
        self.probs
    }

    /// Indices of all-zero rows.
    pub fn empty_rows(&self) -> Vec<usize> {
        self.probs
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, r)| r.sum() == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns `true` if no row is empty.
    pub fn is_stochastic(&self) -> bool {
        self.empty_rows().is_empty()
    }

    /// Sets the diagonal entry of every all-zero row to 1.
    ///
    /// Rows with mass are left untouched, so repairing a matrix without zero
    /// rows returns an identical matrix.
    pub fn fill_empty_rows(&self) -> Self {
        let mut probs = self.probs.clone();
        for i in self.empty_rows() {
            probs[[i, i]] = 1.0;
        }
        Self { probs }
    }

    /// Returns a stochastic copy of the matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::UnnormalizableMatrix`] when zero rows exist and
    /// `fill_empty_classes` is false.
    pub fn require_stochastic(&self, fill_empty_classes: bool) -> Result<Self, MarkovError> {
        let empty = self.empty_rows();
        if empty.is_empty() {
            return Ok(self.clone());
        }
        if !fill_empty_classes {
            return Err(MarkovError::UnnormalizableMatrix { rows: empty.len() });
        }
        debug!(rows = ?empty, "filling empty rows with self-transitions");
        Ok(self.fill_empty_rows())
    }

    /// The submatrix induced by `states`, in the given order.
    pub fn submatrix(&self, states: &[usize]) -> Self {
        let probs = Array2::from_shape_fn((states.len(), states.len()), |(i, j)| {
            self.probs[[states[i], states[j]]]
        });
        Self { probs }
    }
}

fn check_entries(m: &ArrayView2<'_, f64>) -> Result<(), MarkovError> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(MarkovError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(MarkovError::EmptyData);
    }
    for ((row, col), &value) in m.indexed_iter() {
        if !value.is_finite() {
            return Err(MarkovError::NonFiniteEntry { row, col });
        }
        if value < 0.0 {
            return Err(MarkovError::NegativeEntry { row, col, value });
        }
    }
    Ok(())
}

/// Counts transitions between consecutive periods of an encoded panel.
///
/// `codes` is `n x t` with values in `0..k`. Entry `(i, j)` of the result
/// is the number of `i -> j` moves pooled over all `t - 1` period pairs.
///
/// # Errors
///
/// Returns [`MarkovError::EmptyData`] if there are no units and
/// [`MarkovError::InsufficientPeriods`] if `t < 2`.
pub fn count_transitions(codes: ArrayView2<'_, usize>, k: usize) -> Result<Array2<f64>, MarkovError> {
    let (n, t) = codes.dim();
    if n == 0 || k == 0 {
        return Err(MarkovError::EmptyData);
    }
    if t < 2 {
        return Err(MarkovError::InsufficientPeriods { t, min: 2 });
    }
    let mut counts = Array2::zeros((k, k));
    for unit in codes.axis_iter(Axis(0)) {
        for pair in unit.windows(2) {
            counts[[pair[0], pair[1]]] += 1.0;
        }
    }
    Ok(counts)
}

/// Pooled transition counts of a labelled panel.
///
/// # Errors
///
/// Returns [`MarkovError`] if a label is outside `space`, or the panel has
/// no units or fewer than two periods.
pub fn estimate_transitions<L: Ord + Clone>(
    ids: ArrayView2<'_, L>,
    space: &StateSpace<L>,
) -> Result<Array2<f64>, MarkovError> {
    let codes = space.encode(ids)?;
    count_transitions(codes.view(), space.k())
}

/// Prais conditional mobility index, `1 - p_ii` for every state.
pub fn prais(p: &TransitionMatrix) -> Array1<f64> {
    p.probs().diag().mapv(|d| 1.0 - d)
}
