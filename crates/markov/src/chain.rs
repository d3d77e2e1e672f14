//! Markov chains estimated from labelled panels.

use std::sync::OnceLock;

use ndarray::{Array2, ArrayView2, Axis};
use tracing::info;

use geodyn_stats::ordinal_ranks;

use crate::classes::{Classification, classify_chain};
use crate::config::MarkovConfig;
use crate::error::MarkovError;
use crate::passage::mfpt_with;
use crate::sojourn::{SojournTimes, sojourn_time};
use crate::state::StateSpace;
use crate::steady_state::{SteadyState, steady_state_with};
use crate::transition::{TransitionMatrix, estimate_transitions};

/// A discrete Markov chain estimated from an `n x t` panel of labels.
///
/// Derived quantities are computed on first access and cached. They are
/// always computed on the matrix with zero rows repaired, so a chain built
/// without `fill_empty_classes` still exposes them; [`p`](Self::p) keeps the
/// unrepaired estimate in that case.
#[derive(Debug)]
pub struct Markov<L> {
    space: StateSpace<L>,
    transitions: Array2<f64>,
    p: TransitionMatrix,
    repaired: TransitionMatrix,
    classification: Classification,
    config: MarkovConfig,
    steady_state: OnceLock<Result<SteadyState, MarkovError>>,
    mfpt: OnceLock<Result<Array2<f64>, MarkovError>>,
    sojourn: OnceLock<SojournTimes>,
}

impl<L: Ord + Clone> Markov<L> {
    /// Estimates a chain whose states are the sorted unique labels of `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError`] if the configuration is invalid or `ids` is
    /// empty or has fewer than two periods.
    pub fn new(ids: ArrayView2<'_, L>, config: MarkovConfig) -> Result<Self, MarkovError> {
        let space = StateSpace::from_observed(ids)?;
        Self::with_space(ids, space, config)
    }

    /// Estimates a chain over an explicit, ordered class list.
    ///
    /// Classes that never occur keep zero rows in [`p`](Self::p) unless
    /// `fill_empty_classes` is set.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::UnknownLabel`] if `ids` holds a label missing
    /// from `classes`.
    pub fn with_classes(
        ids: ArrayView2<'_, L>,
        classes: Vec<L>,
        config: MarkovConfig,
    ) -> Result<Self, MarkovError> {
        let space = StateSpace::new(classes)?;
        Self::with_space(ids, space, config)
    }

    #[tracing::instrument(skip_all, fields(n = ids.nrows(), t = ids.ncols(), k = space.k()))]
    fn with_space(
        ids: ArrayView2<'_, L>,
        space: StateSpace<L>,
        config: MarkovConfig,
    ) -> Result<Self, MarkovError> {
        config.validate()?;
        let transitions = estimate_transitions(ids, &space)?;
        let estimated = TransitionMatrix::from_counts(&transitions)?;
        let repaired = estimated.fill_empty_rows();
        let p = if config.fill_empty_classes() {
            repaired.clone()
        } else {
            estimated
        };
        let classification = classify_chain(&repaired)?;
        if config.summary() {
            info!("chain classification\n{}", classification.summary());
        }
        Ok(Self {
            space,
            transitions,
            p,
            repaired,
            classification,
            config,
            steady_state: OnceLock::new(),
            mfpt: OnceLock::new(),
            sojourn: OnceLock::new(),
        })
    }

    /// State labels in index order.
    pub fn classes(&self) -> &[L] {
        self.space.labels()
    }

    /// The state space.
    pub fn state_space(&self) -> &StateSpace<L> {
        &self.space
    }
}

impl<L> Markov<L> {
    /// Number of states.
    pub fn k(&self) -> usize {
        self.p.k()
    }

    /// Pooled transition counts.
    pub fn transitions(&self) -> &Array2<f64> {
        &self.transitions
    }

    /// Estimated transition probabilities.
    pub fn p(&self) -> &TransitionMatrix {
        &self.p
    }

    /// Communicating-class decomposition of the repaired matrix.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Stationary distribution(s), computed once.
    pub fn steady_state(&self) -> Result<&SteadyState, MarkovError> {
        self.steady_state
            .get_or_init(|| steady_state_with(&self.repaired, &self.classification))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Mean first passage times, computed once.
    pub fn mfpt(&self) -> Result<&Array2<f64>, MarkovError> {
        self.mfpt
            .get_or_init(|| {
                mfpt_with(
                    &self.repaired,
                    &self.classification,
                    self.config.passage_ceiling(),
                )
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Sojourn times, computed once.
    pub fn sojourn_time(&self) -> &SojournTimes {
        self.sojourn.get_or_init(|| sojourn_time(&self.p))
    }
}

fn column_ranks(y: ArrayView2<'_, f64>) -> Result<Array2<usize>, MarkovError> {
    if y.is_empty() {
        return Err(MarkovError::EmptyData);
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(MarkovError::Stats(geodyn_stats::StatsError::NonFiniteData));
    }
    let mut ranks = Array2::zeros(y.raw_dim());
    for (t, column) in y.axis_iter(Axis(1)).enumerate() {
        let values: Vec<f64> = column.to_vec();
        for (i, r) in ordinal_ranks(&values).into_iter().enumerate() {
            ranks[[i, t]] = r;
        }
    }
    Ok(ranks)
}

/// Full rank Markov chain: each unit's state is its within-period rank,
/// `1` for the largest value and `n` for the smallest.
///
/// # Errors
///
/// Returns [`MarkovError`] if `y` is empty, non-finite or has fewer than
/// two periods.
pub fn full_rank_markov(y: ArrayView2<'_, f64>, config: MarkovConfig) -> Result<Markov<usize>, MarkovError> {
    let ranks = descending_ranks(y)?;
    Markov::new(ranks.view(), config)
}

/// Geographic rank Markov chain: the state at rank `r` in period `t` is the
/// 1-based index of the unit holding ascending rank `r`.
///
/// # Errors
///
/// Returns [`MarkovError`] if `y` is empty, non-finite or has fewer than
/// two periods.
pub fn geo_rank_markov(y: ArrayView2<'_, f64>, config: MarkovConfig) -> Result<Markov<usize>, MarkovError> {
    let ranks = column_ranks(y)?;
    let mut geo = Array2::zeros(ranks.raw_dim());
    for ((unit, t), &r) in ranks.indexed_iter() {
        geo[[r - 1, t]] = unit + 1;
    }
    Markov::new(geo.view(), config)
}

/// Within-period ranks, `1` for the largest value. Ties get distinct ranks
/// in order of appearance.
pub fn descending_ranks(y: ArrayView2<'_, f64>) -> Result<Array2<usize>, MarkovError> {
    let n = y.nrows();
    Ok(column_ranks(y)?.mapv(|r| n - r + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn quiet() -> MarkovConfig {
        MarkovConfig::new().with_summary(false)
    }

    #[test]
    fn estimates_counts_and_probabilities() {
        let ids = array![["a", "b", "a"], ["b", "b", "a"], ["a", "a", "b"]];
        let m = Markov::new(ids.view(), quiet()).unwrap();
        assert_eq!(m.classes(), &["a", "b"]);
        assert_eq!(m.transitions(), &array![[1.0, 2.0], [2.0, 1.0]]);
        assert_abs_diff_eq!(m.p().probs()[[0, 1]], 2.0 / 3.0, epsilon = 1e-12);
        assert!(m.classification().is_irreducible());
        let pi = m.steady_state().unwrap().as_ergodic().unwrap().clone();
        assert_abs_diff_eq!(pi[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn derived_values_are_cached() {
        let ids = array![[0, 1, 0], [1, 1, 0]];
        let m = Markov::new(ids.view(), quiet()).unwrap();
        assert!(std::ptr::eq(m.mfpt().unwrap(), m.mfpt().unwrap()));
        assert!(std::ptr::eq(m.sojourn_time(), m.sojourn_time()));
    }

    #[test]
    fn unobserved_class_keeps_zero_row_without_fill() {
        let ids = array![[0, 1], [1, 0]];
        let m = Markov::with_classes(ids.view(), vec![0, 1, 2], quiet()).unwrap();
        assert_eq!(m.p().empty_rows(), vec![2]);
        // Derived quantities use the repaired matrix.
        assert_eq!(m.steady_state().unwrap().len(), 2);
        assert!(m.sojourn_time().times[2].is_infinite());

        let filled = Markov::with_classes(
            ids.view(),
            vec![0, 1, 2],
            quiet().with_fill_empty_classes(true),
        )
        .unwrap();
        assert_eq!(filled.p().probs()[[2, 2]], 1.0);
    }

    #[test]
    fn undeclared_label_rejected() {
        let ids = array![[0, 3], [1, 0]];
        assert!(matches!(
            Markov::with_classes(ids.view(), vec![0, 1], quiet()),
            Err(MarkovError::UnknownLabel { unit: 0, period: 1 })
        ));
    }

    #[test]
    fn full_rank_states_are_descending_ranks() {
        let y = array![[3.0, 1.0], [1.0, 2.0], [2.0, 3.0]];
        let ranks = descending_ranks(y.view()).unwrap();
        assert_eq!(ranks, array![[1, 3], [3, 2], [2, 1]]);
        let m = full_rank_markov(y.view(), quiet()).unwrap();
        assert_eq!(m.classes(), &[1, 2, 3]);
        // Rank 1 moves to rank 3, rank 3 to 2, rank 2 to 1.
        assert_eq!(m.transitions()[[0, 2]], 1.0);
        assert_eq!(m.transitions()[[2, 1]], 1.0);
        assert_eq!(m.transitions()[[1, 0]], 1.0);
    }

    #[test]
    fn geo_rank_states_are_units() {
        let y = array![[3.0, 1.0], [1.0, 2.0], [2.0, 3.0]];
        let m = geo_rank_markov(y.view(), quiet()).unwrap();
        assert_eq!(m.classes(), &[1, 2, 3]);
        // Ascending rank 1 is unit 2 then unit 1.
        assert_eq!(m.transitions()[[1, 0]], 1.0);
        assert_eq!(m.transitions().sum(), 3.0);
    }
}
