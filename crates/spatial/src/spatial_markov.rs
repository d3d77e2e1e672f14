//! Markov chains conditioned on the class of each unit's spatial lag.
//!
//! For every unit and consecutive period pair the transition
//! `own(t) -> own(t+1)` is counted in the matrix of the lag class the unit
//! was in at `t`, giving `m` conditional `k x k` count matrices. These are
//! compared with the pooled chain through the homogeneity tests, the
//! per-lag chi-square tests and, optionally, a permutation test in which
//! units are shuffled before the lag is taken.

use std::sync::OnceLock;

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::{debug, info};

use geodyn_markov::{
    ChiSquareTest, HomogeneityResults, MarkovError, StateSpace, SteadyState, TransitionMatrix,
    chi2, count_transitions, homogeneity, mfpt, permutation_p_value, steady_state,
};
use geodyn_stats::chi2_sf;

use crate::config::{QuantileScope, SpatialMarkovConfig};
use crate::discretize::{Discretized, discretize};
use crate::error::SpatialError;
use crate::weights::SpatialWeights;

/// Builds a seeded or OS-sourced RNG.
fn make_rng(seed: Option<u64>) -> rand::rngs::StdRng {
    match seed {
        Some(s) => rand::rngs::StdRng::seed_from_u64(s),
        None => rand::rngs::StdRng::from_os_rng(),
    }
}

/// Where lag classes come from.
#[derive(Debug, Clone)]
enum LagSource {
    /// Weighted average of neighbor values, then discretized.
    Continuous { y: Array2<f64>, scope: QuantileScope },
    /// Weighted majority of neighbor class ids.
    Categorical,
}

/// Outcome of the permutation test on `x2`.
#[derive(Debug, Clone, PartialEq)]
pub struct X2Permutation {
    /// `x2` for every permutation, in draw order.
    pub realizations: Vec<f64>,
    /// `(1 + #{realization >= x2}) / (1 + permutations)`.
    pub p_value: f64,
}

/// A spatially conditioned Markov chain.
///
/// # Example
///
/// ```
/// use geodyn_spatial::{NeighborList, SpatialMarkov, SpatialMarkovConfig};
/// use ndarray::Array2;
///
/// let w = NeighborList::lattice(3, 3).unwrap();
/// let y = Array2::from_shape_fn((9, 6), |(i, t)| ((i * 7 + t * 3) % 11) as f64);
/// let sm = SpatialMarkov::new(y.view(), &w, SpatialMarkovConfig::new().with_k(3).with_m(3))
///     .unwrap();
/// assert_eq!(sm.t().dim().1, sm.k());
/// ```
#[derive(Debug)]
pub struct SpatialMarkov {
    k: usize,
    m: usize,
    class_ids: Array2<usize>,
    lag_class_ids: Array2<usize>,
    cutoffs: Option<Vec<f64>>,
    lag_cutoffs: Option<Vec<f64>>,
    transitions: Array2<f64>,
    p: TransitionMatrix,
    t: Array3<f64>,
    conditional: Vec<TransitionMatrix>,
    fill_empty_classes: bool,
    variable_name: Option<String>,
    permutation: Option<X2Permutation>,
    s: OnceLock<Result<SteadyState, SpatialError>>,
    big_s: OnceLock<Result<Vec<SteadyState>, SpatialError>>,
    f: OnceLock<Result<Array2<f64>, SpatialError>>,
    big_f: OnceLock<Result<Array3<f64>, SpatialError>>,
    homogeneity: OnceLock<Result<HomogeneityResults, SpatialError>>,
    chi2: OnceLock<Result<Vec<ChiSquareTest>, SpatialError>>,
    shtest: OnceLock<Result<Vec<ChiSquareTest>, SpatialError>>,
}

impl SpatialMarkov {
    /// Conditions a continuous `n x t` panel on its spatial lag.
    ///
    /// Own values are split into `k` classes and lag values into `m`
    /// classes, by quantiles or by the configured cutoffs. The realized
    /// class counts are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the configuration is invalid, `y` does
    /// not have one row per unit of `w` or fewer than two periods, or
    /// discretization fails.
    #[tracing::instrument(skip_all, fields(n = y.nrows(), t = y.ncols()))]
    pub fn new<W: SpatialWeights>(
        y: ArrayView2<'_, f64>,
        w: &W,
        config: SpatialMarkovConfig,
    ) -> Result<Self, SpatialError> {
        config.validate()?;
        check_panel(y.dim(), w)?;

        let own = discretize(y, config.k(), config.scope(), config.cutoffs())?;
        let lag = discretize(
            w.lag_panel(y)?.view(),
            config.m(),
            config.scope(),
            config.lag_cutoffs(),
        )?;
        debug!(k = own.k, m = lag.k, "realized class counts");

        let source = LagSource::Continuous {
            y: y.to_owned(),
            scope: config.scope(),
        };
        Self::build(own, lag, &source, w, config)
    }

    /// Conditions a panel of categorical labels on the majority label of
    /// each unit's neighbors.
    ///
    /// The classes are the sorted unique labels and lag classes coincide
    /// with them, so `m == k`. The class counts and cutoffs of `config`
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if `ids` does not have one row per unit of
    /// `w` or fewer than two periods.
    #[tracing::instrument(skip_all, fields(n = ids.nrows(), t = ids.ncols()))]
    pub fn from_labels<L: Ord + Clone, W: SpatialWeights>(
        ids: ArrayView2<'_, L>,
        w: &W,
        config: SpatialMarkovConfig,
    ) -> Result<Self, SpatialError> {
        check_panel(ids.dim(), w)?;
        let space = StateSpace::from_observed(ids)?;
        let class_ids = space.encode(ids)?;
        let lag_ids = w.lag_categorical(class_ids.view())?;
        let own = Discretized {
            ids: class_ids,
            k: space.k(),
            cutoffs: None,
        };
        let lag = Discretized {
            ids: lag_ids,
            k: space.k(),
            cutoffs: None,
        };
        Self::build(own, lag, &LagSource::Categorical, w, config)
    }

    fn build<W: SpatialWeights>(
        own: Discretized,
        lag: Discretized,
        source: &LagSource,
        w: &W,
        config: SpatialMarkovConfig,
    ) -> Result<Self, SpatialError> {
        let fill = config.fill_empty_classes();
        let (k, m) = (own.k, lag.k);
        let transitions = count_transitions(own.ids.view(), k)?;
        let p = normalize(&transitions, fill)?;
        let t = count_conditional(own.ids.view(), lag.ids.view(), k, m);
        let conditional = t
            .outer_iter()
            .map(|counts| normalize(&counts.to_owned(), fill))
            .collect::<Result<Vec<_>, _>>()?;

        let permutation = if config.permutations() > 0 {
            let x2 = chi2_sum(t.view(), transitions.view())?;
            let realizations = permute_x2(&own, &lag, &transitions, source, w, &config)?;
            let p_value = permutation_p_value(x2, &realizations);
            info!(
                permutations = realizations.len(),
                x2, p_value, "x2 permutation test"
            );
            Some(X2Permutation {
                realizations,
                p_value,
            })
        } else {
            None
        };

        Ok(Self {
            k,
            m,
            class_ids: own.ids,
            lag_class_ids: lag.ids,
            cutoffs: own.cutoffs,
            lag_cutoffs: lag.cutoffs,
            transitions,
            p,
            t,
            conditional,
            fill_empty_classes: fill,
            variable_name: config.variable_name().map(str::to_string),
            permutation,
            s: OnceLock::new(),
            big_s: OnceLock::new(),
            f: OnceLock::new(),
            big_f: OnceLock::new(),
            homogeneity: OnceLock::new(),
            chi2: OnceLock::new(),
            shtest: OnceLock::new(),
        })
    }

    /// Number of own classes.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of lag classes.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Own class id per unit and period.
    pub fn class_ids(&self) -> &Array2<usize> {
        &self.class_ids
    }

    /// Lag class id per unit and period.
    pub fn lag_class_ids(&self) -> &Array2<usize> {
        &self.lag_class_ids
    }

    /// Own class upper bounds, without the last one.
    pub fn cutoffs(&self) -> Option<&[f64]> {
        self.cutoffs.as_deref()
    }

    /// Lag class upper bounds, without the last one.
    pub fn lag_cutoffs(&self) -> Option<&[f64]> {
        self.lag_cutoffs.as_deref()
    }

    /// Pooled transition counts (`k x k`).
    pub fn transitions(&self) -> &Array2<f64> {
        &self.transitions
    }

    /// Pooled transition probabilities.
    pub fn p(&self) -> &TransitionMatrix {
        &self.p
    }

    /// Conditional transition counts (`m x k x k`).
    pub fn t(&self) -> &Array3<f64> {
        &self.t
    }

    /// Conditional transition probabilities of lag class `i`.
    pub fn conditional(&self, i: usize) -> Option<&TransitionMatrix> {
        self.conditional.get(i)
    }

    /// Conditional transition probabilities stacked into `m x k x k`.
    pub fn big_p(&self) -> Array3<f64> {
        let mut out = Array3::zeros(self.t.raw_dim());
        for (i, p) in self.conditional.iter().enumerate() {
            out.index_axis_mut(Axis(0), i).assign(p.probs());
        }
        out
    }

    /// Steady state of the pooled chain.
    pub fn s(&self) -> Result<&SteadyState, SpatialError> {
        self.s
            .get_or_init(|| Ok(steady_state(&self.p, self.fill_empty_classes)?))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Steady state of each conditional chain.
    pub fn big_s(&self) -> Result<&[SteadyState], SpatialError> {
        self.big_s
            .get_or_init(|| {
                self.conditional
                    .iter()
                    .map(|p| steady_state(p, self.fill_empty_classes).map_err(SpatialError::from))
                    .collect()
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }

    /// Mean first passage times of the pooled chain.
    pub fn f(&self) -> Result<&Array2<f64>, SpatialError> {
        self.f
            .get_or_init(|| Ok(mfpt(&self.p, self.fill_empty_classes)?))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Mean first passage times of each conditional chain (`m x k x k`).
    pub fn big_f(&self) -> Result<&Array3<f64>, SpatialError> {
        self.big_f
            .get_or_init(|| {
                let mut out = Array3::zeros(self.t.raw_dim());
                for (i, p) in self.conditional.iter().enumerate() {
                    out.index_axis_mut(Axis(0), i)
                        .assign(&mfpt(p, self.fill_empty_classes)?);
                }
                Ok(out)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Homogeneity test of the conditional matrices against the pooled one.
    ///
    /// Regimes are named `LAG0..`, classes `C0..`, and the title carries
    /// the variable name when one was configured.
    pub fn homogeneity(&self) -> Result<&HomogeneityResults, SpatialError> {
        self.homogeneity
            .get_or_init(|| {
                let regimes: Vec<String> = (0..self.m).map(|i| format!("LAG{i}")).collect();
                let classes: Vec<String> = (0..self.k).map(|i| format!("C{i}")).collect();
                let title = match &self.variable_name {
                    Some(name) => format!("Spatial Markov Test: {name}"),
                    None => "Spatial Markov Test".to_string(),
                };
                Ok(homogeneity(self.t.view(), &regimes, &classes)?.with_title(title))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Pearson-type homogeneity statistic.
    pub fn q(&self) -> Result<f64, SpatialError> {
        Ok(self.homogeneity()?.q)
    }

    /// Likelihood ratio homogeneity statistic.
    pub fn lr(&self) -> Result<f64, SpatialError> {
        Ok(self.homogeneity()?.lr)
    }

    /// Degrees of freedom of the homogeneity tests.
    pub fn dof_hom(&self) -> Result<usize, SpatialError> {
        Ok(self.homogeneity()?.dof)
    }

    /// p-value of [`q`](Self::q).
    pub fn q_p_value(&self) -> Result<f64, SpatialError> {
        Ok(self.homogeneity()?.q_p_value)
    }

    /// p-value of [`lr`](Self::lr).
    pub fn lr_p_value(&self) -> Result<f64, SpatialError> {
        Ok(self.homogeneity()?.lr_p_value)
    }

    /// Chi-square test of each conditional count matrix against the pooled
    /// probabilities.
    pub fn chi2(&self) -> Result<&[ChiSquareTest], SpatialError> {
        self.chi2
            .get_or_init(|| {
                self.t
                    .outer_iter()
                    .map(|counts| chi2(counts, self.transitions.view()).map_err(SpatialError::from))
                    .collect()
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }

    /// Sum of the per-lag chi-square statistics.
    pub fn x2(&self) -> Result<f64, SpatialError> {
        Ok(self.chi2()?.iter().map(|c| c.statistic).sum())
    }

    /// Degrees of freedom of [`x2`](Self::x2): `k (k - 1)^2`.
    pub fn x2_dof(&self) -> usize {
        let k = self.k;
        k * k.saturating_sub(1) * k.saturating_sub(1)
    }

    /// Asymptotic p-value of [`x2`](Self::x2).
    pub fn x2_pvalue(&self) -> Result<f64, SpatialError> {
        Ok(chi2_sf(self.x2()?, self.x2_dof()))
    }

    /// Permutation test of `x2`, present when permutations were requested.
    pub fn x2_permutation(&self) -> Option<&X2Permutation> {
        self.permutation.as_ref()
    }

    /// `x2` for every permutation.
    pub fn x2_realizations(&self) -> Option<&[f64]> {
        self.permutation.as_ref().map(|p| p.realizations.as_slice())
    }

    /// Pseudo p-value of `x2` from the permutations.
    pub fn x2_rpvalue(&self) -> Option<f64> {
        self.permutation.as_ref().map(|p| p.p_value)
    }

    /// Multinomial tests of each conditional steady state against the
    /// pooled one.
    ///
    /// For lag class `i` with `n_i` transitions, observed counts are
    /// `n_i * S_i` and expected counts `n_i * s`; the statistic has
    /// `k - 1` degrees of freedom.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::NotErgodic`] (wrapped) if the pooled or a
    /// conditional chain has more than one recurrent class.
    pub fn shtest(&self) -> Result<&[ChiSquareTest], SpatialError> {
        self.shtest
            .get_or_init(|| {
                let s = ergodic(self.s()?)?;
                let dof = self.k.saturating_sub(1);
                self.big_s()?
                    .iter()
                    .zip(self.t.outer_iter())
                    .map(|(state, counts)| -> Result<ChiSquareTest, SpatialError> {
                        let s_i = ergodic(state)?;
                        let nt = counts.sum();
                        let statistic: f64 = s
                            .iter()
                            .zip(s_i.iter())
                            .map(|(&pe, &po)| {
                                let e = nt * pe;
                                let d = nt * po - e;
                                d * d / e
                            })
                            .sum();
                        Ok(ChiSquareTest {
                            statistic,
                            p_value: chi2_sf(statistic, dof),
                            dof,
                        })
                    })
                    .collect()
            })
            .as_ref()
            .map(Vec::as_slice)
            .map_err(Clone::clone)
    }

    /// Text summary of the homogeneity test.
    pub fn summary(&self) -> Result<String, SpatialError> {
        Ok(self.homogeneity()?.to_string())
    }
}

fn ergodic(state: &SteadyState) -> Result<&Array1<f64>, SpatialError> {
    state.as_ergodic().ok_or_else(|| {
        SpatialError::Markov(MarkovError::NotErgodic {
            classes: state.len(),
        })
    })
}

fn check_panel<W: SpatialWeights>((n, t): (usize, usize), w: &W) -> Result<(), SpatialError> {
    if n == 0 || t == 0 {
        return Err(SpatialError::EmptyData);
    }
    if n != w.n() {
        return Err(SpatialError::ShapeMismatch {
            field: "units",
            expected: w.n(),
            got: n,
        });
    }
    if t < 2 {
        return Err(MarkovError::InsufficientPeriods { t, min: 2 }.into());
    }
    Ok(())
}

fn normalize(counts: &Array2<f64>, fill: bool) -> Result<TransitionMatrix, SpatialError> {
    let p = TransitionMatrix::from_counts(counts)?;
    Ok(if fill { p.fill_empty_rows() } else { p })
}

/// `T[lag(t)][own(t)][own(t+1)]` over all units and period pairs.
fn count_conditional(
    class_ids: ArrayView2<'_, usize>,
    lag_ids: ArrayView2<'_, usize>,
    k: usize,
    m: usize,
) -> Array3<f64> {
    let mut t = Array3::zeros((m, k, k));
    for (own, lag) in class_ids.outer_iter().zip(lag_ids.outer_iter()) {
        for step in 0..own.len().saturating_sub(1) {
            t[[lag[step], own[step], own[step + 1]]] += 1.0;
        }
    }
    t
}

fn chi2_sum(t: ArrayView3<'_, f64>, pooled: ArrayView2<'_, f64>) -> Result<f64, SpatialError> {
    let mut total = 0.0;
    for counts in t.outer_iter() {
        total += chi2(counts, pooled)?.statistic;
    }
    Ok(total)
}

/// Lag class ids after reordering units by `order`, with own classes held
/// fixed. Continuous lags reuse the observed lag bounds when there are any.
fn permuted_lag_ids<W: SpatialWeights>(
    order: &[usize],
    own: &Discretized,
    lag: &Discretized,
    source: &LagSource,
    w: &W,
) -> Result<Array2<usize>, SpatialError> {
    match source {
        LagSource::Continuous { y, scope } => {
            let shuffled = y.select(Axis(0), order);
            let lagged = w.lag_panel(shuffled.view())?;
            Ok(discretize(lagged.view(), lag.k, *scope, lag.cutoffs.as_deref())?.ids)
        }
        LagSource::Categorical => {
            let shuffled = own.ids.select(Axis(0), order);
            w.lag_categorical(shuffled.view())
        }
    }
}

fn permute_x2<W: SpatialWeights>(
    own: &Discretized,
    lag: &Discretized,
    transitions: &Array2<f64>,
    source: &LagSource,
    w: &W,
    config: &SpatialMarkovConfig,
) -> Result<Vec<f64>, SpatialError> {
    let n = own.ids.nrows();
    let mut rng = make_rng(config.seed());
    let orders: Vec<Vec<usize>> = (0..config.permutations())
        .map(|_| {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut rng);
            order
        })
        .collect();

    orders
        .par_iter()
        .map(|order| {
            let lag_ids = permuted_lag_ids(order, own, lag, source, w)?;
            let t = count_conditional(own.ids.view(), lag_ids.view(), own.k, lag.k);
            chi2_sum(t.view(), transitions.view())
        })
        .collect()
}
