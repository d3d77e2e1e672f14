//! Directional analysis of LISA movement.
//!
//! Each unit moves in the plane spanned by its value and its spatial lag
//! between the first and last period. The direction of that move is binned
//! into `k` equal circular sectors, and sector counts are compared with
//! counts under random spatial permutations of the units.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::debug;

use geodyn_markov::MarkovError;
use geodyn_spatial::SpatialWeights;
use geodyn_stats::{mean, std_population};

use crate::config::RoseConfig;
use crate::error::LisaError;

/// Alternative hypothesis for the sector permutation test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Alternative {
    /// Counts differ from random in either direction.
    #[default]
    TwoSided,
    /// Value and lag move together: more moves into quadrants I and III.
    Positive,
    /// Value and lag move apart: more moves into quadrants II and IV.
    Negative,
}

impl FromStr for Alternative {
    type Err = LisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "two.sided" | "two-sided" | "two_sided" => Ok(Alternative::TwoSided),
            "positive" => Ok(Alternative::Positive),
            "negative" => Ok(Alternative::Negative),
            _ => Err(LisaError::InvalidAlternative {
                name: s.to_string(),
            }),
        }
    }
}

/// Counts of a rose permutation test.
#[derive(Debug, Clone, PartialEq)]
pub struct RosePermutation {
    /// Sector counts of every permutation (`permutations x k`).
    pub counts: Array2<usize>,
    /// Permutations with a count at least the observed one, per sector.
    pub larger: Array1<usize>,
    /// Permutations with a count at most the observed one, per sector.
    pub smaller: Array1<usize>,
    /// Mean permuted count per sector.
    pub expected: Array1<f64>,
    /// Population standard deviation of the permuted counts per sector.
    pub std: Array1<f64>,
    /// Pseudo p-value per sector under the chosen alternative.
    pub p_values: Array1<f64>,
    /// The alternative the p-values refer to.
    pub alternative: Alternative,
}

/// Rose diagram of LISA movement vectors.
#[derive(Debug)]
pub struct Rose<'w, W> {
    w: &'w W,
    k: usize,
    y: Array2<f64>,
    lag: Array2<f64>,
    theta: Array1<f64>,
    r: Array1<f64>,
    bins: Array1<f64>,
    counts: Array1<usize>,
}

impl<'w, W: SpatialWeights> Rose<'w, W> {
    /// Computes movement vectors between the first and last period of `y`
    /// and their sector histogram.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError`] if the configuration is invalid, `y` has fewer
    /// than two periods, holds a NaN or infinite value, or does not have
    /// one row per unit of `w`.
    pub fn new(y: ArrayView2<'_, f64>, w: &'w W, config: RoseConfig) -> Result<Self, LisaError> {
        config.validate()?;
        let (n, t) = y.dim();
        if n == 0 {
            return Err(LisaError::EmptyData);
        }
        if t < 2 {
            return Err(MarkovError::InsufficientPeriods { t, min: 2 }.into());
        }
        if let Some(((unit, period), _)) = y.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(LisaError::NonFiniteData { unit, period });
        }
        let k = config.k();
        let lag = w.lag_panel(y)?;
        let movement = Movement::of(y, lag.view());
        let counts = sector_counts(&movement.theta, k);
        let width = TAU / k as f64;
        let bins = Array1::from_shape_fn(k + 1, |i| i as f64 * width);
        debug!(n, k, "rose histogram computed");

        Ok(Self {
            w,
            k,
            y: y.to_owned(),
            lag,
            theta: movement.theta,
            r: movement.r,
            bins,
            counts,
        })
    }

    /// Number of sectors.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Spatial lag of every unit and period.
    pub fn lag(&self) -> &Array2<f64> {
        &self.lag
    }

    /// Direction of every movement vector in `(-pi, pi]`.
    pub fn theta(&self) -> &Array1<f64> {
        &self.theta
    }

    /// Length of every movement vector.
    pub fn r(&self) -> &Array1<f64> {
        &self.r
    }

    /// Sector bounds in radians, `k + 1` values from 0 to `2 pi`.
    pub fn bins(&self) -> &Array1<f64> {
        &self.bins
    }

    /// Number of movement vectors in each sector.
    pub fn counts(&self) -> &Array1<usize> {
        &self.counts
    }

    /// Compares the sector counts with counts after randomly reassigning
    /// the value series to locations.
    ///
    /// Permutation orders are drawn from `rng` in sequence and evaluated in
    /// parallel, so a seeded `rng` gives reproducible results.
    ///
    /// # Errors
    ///
    /// Returns [`LisaError::InvalidConfig`] if `permutations` is zero.
    pub fn permute<R: Rng + ?Sized>(
        &self,
        permutations: usize,
        alternative: Alternative,
        rng: &mut R,
    ) -> Result<RosePermutation, LisaError> {
        if permutations == 0 {
            return Err(LisaError::InvalidConfig {
                reason: "permutations must be at least 1".to_string(),
            });
        }
        let n = self.y.nrows();
        let orders: Vec<Vec<usize>> = (0..permutations)
            .map(|_| {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(rng);
                order
            })
            .collect();

        let rows = orders
            .par_iter()
            .map(|order| -> Result<Array1<usize>, LisaError> {
                let shuffled = self.y.select(Axis(0), order);
                let lag = self.w.lag_panel(shuffled.view())?;
                let movement = Movement::of(shuffled.view(), lag.view());
                Ok(sector_counts(&movement.theta, self.k))
            })
            .collect::<Result<Vec<Array1<usize>>, LisaError>>()?;

        let mut counts = Array2::zeros((permutations, self.k));
        for (mut row, observed) in counts.outer_iter_mut().zip(&rows) {
            row.assign(observed);
        }

        let mut larger = Array1::zeros(self.k);
        let mut smaller = Array1::zeros(self.k);
        let mut expected = Array1::zeros(self.k);
        let mut std = Array1::zeros(self.k);
        for (s, column) in counts.axis_iter(Axis(1)).enumerate() {
            let observed = self.counts[s];
            larger[s] = column.iter().filter(|&&c| c >= observed).count();
            smaller[s] = column.iter().filter(|&&c| c <= observed).count();
            let values: Vec<f64> = column.iter().map(|&c| c as f64).collect();
            expected[s] = mean(&values);
            std[s] = std_population(&values);
        }

        let denom = (permutations + 1) as f64;
        let p_values = Array1::from_shape_fn(self.k, |s| {
            let upper = (larger[s] + 1) as f64 / denom;
            let lower = (smaller[s] + 1) as f64 / denom;
            let positive = co_movement_sector(s, self.k);
            match alternative {
                Alternative::TwoSided => {
                    if upper < 0.5 {
                        2.0 * upper
                    } else {
                        2.0 * (1.0 - upper)
                    }
                }
                Alternative::Positive => {
                    if positive {
                        upper
                    } else {
                        lower
                    }
                }
                Alternative::Negative => {
                    if positive {
                        lower
                    } else {
                        upper
                    }
                }
            }
        });

        Ok(RosePermutation {
            counts,
            larger,
            smaller,
            expected,
            std,
            p_values,
            alternative,
        })
    }
}

struct Movement {
    theta: Array1<f64>,
    r: Array1<f64>,
}

impl Movement {
    fn of(y: ArrayView2<'_, f64>, lag: ArrayView2<'_, f64>) -> Self {
        let last = y.ncols() - 1;
        let dx = &y.column(last) - &y.column(0);
        let dy = &lag.column(last) - &lag.column(0);
        let theta = Array1::from_shape_fn(dx.len(), |i| dy[i].atan2(dx[i]));
        let r = Array1::from_shape_fn(dx.len(), |i| dx[i].hypot(dy[i]));
        Self { theta, r }
    }
}

/// Sector histogram of directions mapped onto `[0, 2 pi)`.
fn sector_counts(theta: &Array1<f64>, k: usize) -> Array1<usize> {
    let width = TAU / k as f64;
    let mut counts = Array1::zeros(k);
    for &t in theta {
        let angle = if t < 0.0 { t + TAU } else { t };
        let sector = ((angle / width) as usize).min(k - 1);
        counts[sector] += 1;
    }
    counts
}

/// Whether sector `s` of `k` lies in quadrant I or III of the movement
/// plane, judged by its midpoint.
fn co_movement_sector(s: usize, k: usize) -> bool {
    let mid = (s as f64 + 0.5) * TAU / k as f64;
    let quadrant = (mid / FRAC_PI_2) as usize;
    quadrant % 2 == 0
}
