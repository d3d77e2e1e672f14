//! Configuration for spatially conditioned Markov chains.

use crate::error::SpatialError;

/// How quantile classes are formed when no explicit cutoffs are given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuantileScope {
    /// One set of quantiles over all periods pooled.
    #[default]
    Pooled,
    /// Separate quantiles for every period.
    PerPeriod,
}

/// Configuration for [`SpatialMarkov`](crate::SpatialMarkov).
///
/// # Example
///
/// ```
/// use geodyn_spatial::{QuantileScope, SpatialMarkovConfig};
///
/// let config = SpatialMarkovConfig::new()
///     .with_k(5)
///     .with_m(3)
///     .with_scope(QuantileScope::PerPeriod)
///     .with_permutations(99)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SpatialMarkovConfig {
    k: usize,
    m: usize,
    scope: QuantileScope,
    cutoffs: Option<Vec<f64>>,
    lag_cutoffs: Option<Vec<f64>>,
    permutations: usize,
    seed: Option<u64>,
    fill_empty_classes: bool,
    variable_name: Option<String>,
}

impl SpatialMarkovConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `k = 4`, `m = 4`, pooled quantiles, no cutoffs, no
    /// permutations, OS-seeded RNG, no zero-row repair.
    pub fn new() -> Self {
        Self {
            k: 4,
            m: 4,
            scope: QuantileScope::Pooled,
            cutoffs: None,
            lag_cutoffs: None,
            permutations: 0,
            seed: None,
            fill_empty_classes: false,
            variable_name: None,
        }
    }

    /// Sets the number of own-value classes.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the number of lag classes.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Sets pooled or per-period quantiles.
    pub fn with_scope(mut self, scope: QuantileScope) -> Self {
        self.scope = scope;
        self
    }

    /// Classifies own values with explicit cutoffs instead of quantiles.
    pub fn with_cutoffs(mut self, cutoffs: Vec<f64>) -> Self {
        self.cutoffs = Some(cutoffs);
        self
    }

    /// Classifies lag values with explicit cutoffs instead of quantiles.
    pub fn with_lag_cutoffs(mut self, cutoffs: Vec<f64>) -> Self {
        self.lag_cutoffs = Some(cutoffs);
        self
    }

    /// Sets the number of random permutations for the `x2` test.
    pub fn with_permutations(mut self, permutations: usize) -> Self {
        self.permutations = permutations;
        self
    }

    /// Seeds the permutation RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Repairs all-zero rows of the estimated matrices with a diagonal 1.
    pub fn with_fill_empty_classes(mut self, fill: bool) -> Self {
        self.fill_empty_classes = fill;
        self
    }

    /// Names the variable in the summary title.
    pub fn with_variable_name(mut self, name: impl Into<String>) -> Self {
        self.variable_name = Some(name.into());
        self
    }

    /// Returns the requested number of own-value classes.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the requested number of lag classes.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Returns the quantile scope.
    pub fn scope(&self) -> QuantileScope {
        self.scope
    }

    /// Returns the own-value cutoffs, if any.
    pub fn cutoffs(&self) -> Option<&[f64]> {
        self.cutoffs.as_deref()
    }

    /// Returns the lag cutoffs, if any.
    pub fn lag_cutoffs(&self) -> Option<&[f64]> {
        self.lag_cutoffs.as_deref()
    }

    /// Returns the number of permutations.
    pub fn permutations(&self) -> usize {
        self.permutations
    }

    /// Returns the RNG seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns whether zero rows are repaired.
    pub fn fill_empty_classes(&self) -> bool {
        self.fill_empty_classes
    }

    /// Returns the variable name, if any.
    pub fn variable_name(&self) -> Option<&str> {
        self.variable_name.as_deref()
    }

    /// Validates this configuration.
    ///
    /// Class counts must be at least 1 unless cutoffs are supplied.
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.k == 0 && self.cutoffs.is_none() {
            return Err(SpatialError::InvalidConfig {
                reason: "k must be at least 1".to_string(),
            });
        }
        if self.m == 0 && self.lag_cutoffs.is_none() {
            return Err(SpatialError::InvalidConfig {
                reason: "m must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SpatialMarkovConfig {
    fn default() -> Self {
        Self::new()
    }
}
