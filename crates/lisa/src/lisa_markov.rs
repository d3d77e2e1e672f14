//! Markov chains over the four Moran scatterplot quadrants.

use ndarray::{Array2, ArrayView2, Axis};
use tracing::debug;

use geodyn_markov::{ChiSquareTest, Markov, MarkovConfig, SteadyState, TransitionMatrix, chi2};
use geodyn_spatial::SpatialWeights;

use crate::config::LisaConfig;
use crate::error::LisaError;
use crate::quadrant::{Quadrant, move_type, significant_move_type};
use crate::spillover::{Spillover, detect_spillover};

/// Comparison of observed LISA transitions with those expected if a unit's
/// value and its spatial lag moved independently.
#[derive(Debug, Clone, PartialEq)]
pub struct IndependenceTest {
    /// Expected transition counts (`4 x 4`, quadrant order).
    pub expected: Array2<f64>,
    /// Chi-square test of the observed against the expected counts.
    pub test: ChiSquareTest,
}

/// A Markov chain over LISA quadrants with per-transition move types.
#[derive(Debug)]
pub struct LisaMarkov {
    chain: Markov<Quadrant>,
    q: Array2<Quadrant>,
    p_values: Option<Array2<f64>>,
    significance_level: f64,
    move_types: Array2<u8>,
    significant_moves: Option<Array2<u8>>,
}

impl LisaMarkov {
    /// Builds the chain from an `n x t` panel of quadrants.
    ///
    /// The state space is always the four quadrants in code order, whether
    /// or not each is visited. When `p_values` are given, endpoints with a
    /// p-value at or below the significance level are significant and the
    /// refined move types are computed.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError`] if the configuration is invalid, the panel has
    /// fewer than two periods or `p_values` differs in shape from `q`.
    #[tracing::instrument(skip_all, fields(n = q.nrows(), t = q.ncols()))]
    pub fn new(
        q: ArrayView2<'_, Quadrant>,
        p_values: Option<ArrayView2<'_, f64>>,
        config: LisaConfig,
    ) -> Result<Self, LisaError> {
        config.validate()?;
        if let Some(p) = &p_values {
            check_same_shape(q.dim(), p.dim())?;
        }
        let chain = Markov::with_classes(
            q,
            Quadrant::ALL.to_vec(),
            MarkovConfig::new().with_summary(false),
        )?;

        let significance_level = config.significance_level();
        let significant = p_values.map(|p| p.mapv(|v| v <= significance_level));

        let (n, t) = q.dim();
        let mut move_types = Array2::zeros((n, t - 1));
        let mut significant_moves = significant.as_ref().map(|_| Array2::zeros((n, t - 1)));
        for ((i, step), code) in move_types.indexed_iter_mut() {
            let (origin, destination) = (q[[i, step]], q[[i, step + 1]]);
            *code = move_type(origin, destination);
            if let (Some(sig), Some(moves)) = (&significant, significant_moves.as_mut()) {
                moves[[i, step]] = significant_move_type(
                    origin,
                    destination,
                    sig[[i, step]],
                    sig[[i, step + 1]],
                );
            }
        }
        debug!(
            with_significance = significant_moves.is_some(),
            "LISA move types computed"
        );

        Ok(Self {
            chain,
            q: q.to_owned(),
            p_values: p_values.map(|p| p.to_owned()),
            significance_level,
            move_types,
            significant_moves,
        })
    }

    /// Builds the chain from numeric quadrant codes in `1..=4`.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError::InvalidQuadrant`] for a code outside `1..=4`,
    /// plus the errors of [`new`](Self::new).
    pub fn from_codes(
        codes: ArrayView2<'_, u8>,
        p_values: Option<ArrayView2<'_, f64>>,
        config: LisaConfig,
    ) -> Result<Self, LisaError> {
        let mut q = Array2::from_elem(codes.raw_dim(), Quadrant::HH);
        for (slot, &code) in q.iter_mut().zip(codes.iter()) {
            *slot = Quadrant::try_from(code)?;
        }
        Self::new(q.view(), p_values, config)
    }

    /// The underlying quadrant chain.
    pub fn chain(&self) -> &Markov<Quadrant> {
        &self.chain
    }

    /// Quadrant of every unit and period.
    pub fn q(&self) -> &Array2<Quadrant> {
        &self.q
    }

    /// Transition counts between quadrants (`4 x 4`).
    pub fn transitions(&self) -> &Array2<f64> {
        self.chain.transitions()
    }

    /// Transition probabilities between quadrants.
    pub fn p(&self) -> &TransitionMatrix {
        self.chain.p()
    }

    /// Steady state of the quadrant chain.
    pub fn steady_state(&self) -> Result<&SteadyState, LisaError> {
        Ok(self.chain.steady_state()?)
    }

    /// Move type of every transition (`n x t-1`), in `1..=16`.
    pub fn move_types(&self) -> &Array2<u8> {
        &self.move_types
    }

    /// Significance-refined move types (`n x t-1`), in `1..=64`, when
    /// p-values were supplied.
    pub fn significant_moves(&self) -> Option<&Array2<u8>> {
        self.significant_moves.as_ref()
    }

    /// LISA p-values, when supplied.
    pub fn p_values(&self) -> Option<&Array2<f64>> {
        self.p_values.as_ref()
    }

    /// Level at or below which a p-value is significant.
    pub fn significance_level(&self) -> f64 {
        self.significance_level
    }

    /// Tests whether the moves of `y` are independent of the moves of its
    /// spatial lag.
    ///
    /// Two binary chains are estimated, one for whether a unit is above
    /// its period mean and one for whether its lag of deviations is
    /// positive. Their product gives quadrant transition probabilities
    /// under independence, which are scaled to the observed row totals and
    /// compared with the observed transitions.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError`] if `y` differs in shape from the quadrant
    /// panel or does not have one row per unit of `w`.
    pub fn independence_test<W: SpatialWeights>(
        &self,
        y: ArrayView2<'_, f64>,
        w: &W,
    ) -> Result<IndependenceTest, LisaError> {
        check_same_shape(self.q.dim(), y.dim())?;
        let means = y.mean_axis(Axis(0)).ok_or(LisaError::EmptyData)?;
        let z = &y - &means;
        let lag = w.lag_panel(z.view())?;

        let own_p = high_low_chain(z.mapv(|v| v > 0.0).view())?;
        let lag_p = high_low_chain(lag.mapv(|v| v > 0.0).view())?;

        // Axis positions (own, lag) of each quadrant, 0 = high and 1 = low.
        let position = |q: Quadrant| match q {
            Quadrant::HH => (0, 0),
            Quadrant::LH => (1, 0),
            Quadrant::LL => (1, 1),
            Quadrant::HL => (0, 1),
        };
        let totals = self.transitions().sum_axis(Axis(1));
        let mut expected = Array2::zeros((4, 4));
        for (a, &qa) in Quadrant::ALL.iter().enumerate() {
            let (oa, la) = position(qa);
            for (b, &qb) in Quadrant::ALL.iter().enumerate() {
                let (ob, lb) = position(qb);
                expected[[a, b]] = totals[a] * own_p[[oa, ob]] * lag_p[[la, lb]];
            }
        }

        let test = chi2(self.transitions().view(), expected.view())?;
        Ok(IndependenceTest { expected, test })
    }

    /// Detects spillover into existing clusters of `quadrant`.
    ///
    /// See [`detect_spillover`] for the cluster definition.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError::MissingSignificance`] if no p-values were
    /// supplied, or a shape error if `w` has the wrong number of units.
    pub fn spillover<W: SpatialWeights>(
        &self,
        quadrant: Quadrant,
        neighbors_on: bool,
        w: &W,
    ) -> Result<Spillover, LisaError> {
        let p = self.p_values.as_ref().ok_or(LisaError::MissingSignificance)?;
        let level = self.significance_level;
        let cores = Array2::from_shape_fn(self.q.raw_dim(), |(i, t)| {
            self.q[[i, t]] == quadrant && p[[i, t]] <= level
        });
        detect_spillover(cores.view(), neighbors_on, w)
    }
}

fn check_same_shape(expected: (usize, usize), got: (usize, usize)) -> Result<(), LisaError> {
    if expected.0 != got.0 {
        return Err(LisaError::ShapeMismatch {
            field: "units",
            expected: expected.0,
            got: got.0,
        });
    }
    if expected.1 != got.1 {
        return Err(LisaError::ShapeMismatch {
            field: "periods",
            expected: expected.1,
            got: got.1,
        });
    }
    Ok(())
}

/// Transition probabilities of a high (`true`) / low chain, high first.
fn high_low_chain(high: ArrayView2<'_, bool>) -> Result<Array2<f64>, LisaError> {
    let chain = Markov::with_classes(
        high,
        vec![true, false],
        MarkovConfig::new().with_summary(false),
    )?;
    Ok(chain.p().probs().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn codes() -> Array2<u8> {
        array![[1, 1, 2], [3, 3, 3], [4, 1, 1], [2, 3, 4]]
    }

    #[test]
    fn move_types_from_codes() {
        let lm = LisaMarkov::from_codes(codes().view(), None, LisaConfig::new()).unwrap();
        assert_eq!(lm.move_types(), &array![[1, 2], [11, 11], [13, 1], [7, 12]]);
        assert!(lm.significant_moves().is_none());
        assert_eq!(lm.transitions().sum(), 8.0);
        assert_eq!(lm.chain().k(), 4);
    }

    #[test]
    fn significant_moves_use_level() {
        let p = array![
            [0.01, 0.01, 0.5],
            [0.5, 0.5, 0.5],
            [0.05, 0.2, 0.01],
            [0.5, 0.02, 0.5]
        ];
        let lm = LisaMarkov::from_codes(codes().view(), Some(p.view()), LisaConfig::new()).unwrap();
        let sm = lm.significant_moves().unwrap();
        assert_eq!(sm[[0, 0]], 1);
        assert_eq!(sm[[0, 1]], 16 + 2);
        assert_eq!(sm[[1, 0]], 48 + 11);
        assert_eq!(sm[[2, 0]], 16 + 13);
        assert_eq!(sm[[2, 1]], 32 + 1);
        assert_eq!(sm[[3, 0]], 32 + 7);
    }

    #[test]
    fn invalid_codes_rejected() {
        let bad = array![[1, 5], [2, 2]];
        assert!(matches!(
            LisaMarkov::from_codes(bad.view(), None, LisaConfig::new()),
            Err(LisaError::InvalidQuadrant { value: 5 })
        ));
    }

    #[test]
    fn p_value_shape_checked() {
        let p = Array2::<f64>::zeros((4, 2));
        assert!(matches!(
            LisaMarkov::from_codes(codes().view(), Some(p.view()), LisaConfig::new()),
            Err(LisaError::ShapeMismatch { field: "periods", .. })
        ));
    }

    #[test]
    fn spillover_requires_p_values() {
        let lm = LisaMarkov::from_codes(codes().view(), None, LisaConfig::new()).unwrap();
        let w = geodyn_spatial::NeighborList::lattice(2, 2).unwrap();
        assert!(matches!(
            lm.spillover(Quadrant::HH, false, &w),
            Err(LisaError::MissingSignificance)
        ));
    }
}
