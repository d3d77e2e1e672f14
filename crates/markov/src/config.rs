//! Configuration for Markov chain estimation.

use crate::error::MarkovError;
use crate::passage::DEFAULT_PASSAGE_CEILING;

/// Configuration for [`Markov`](crate::Markov) estimation.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use geodyn_markov::MarkovConfig;
///
/// let config = MarkovConfig::new()
///     .with_fill_empty_classes(true)
///     .with_summary(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct MarkovConfig {
    fill_empty_classes: bool,
    summary: bool,
    passage_ceiling: f64,
}

impl MarkovConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `fill_empty_classes = false`, `summary = true`,
    /// `passage_ceiling = 1e16`.
    pub fn new() -> Self {
        Self {
            fill_empty_classes: false,
            summary: true,
            passage_ceiling: DEFAULT_PASSAGE_CEILING,
        }
    }

    /// Repairs all-zero rows of the estimated matrix with a diagonal 1.
    pub fn with_fill_empty_classes(mut self, fill: bool) -> Self {
        self.fill_empty_classes = fill;
        self
    }

    /// Logs the chain classification at `info` level after estimation.
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    /// Sets the magnitude above which passage times are reported as `+inf`.
    pub fn with_passage_ceiling(mut self, ceiling: f64) -> Self {
        self.passage_ceiling = ceiling;
        self
    }

    /// Returns whether zero rows are repaired.
    pub fn fill_empty_classes(&self) -> bool {
        self.fill_empty_classes
    }

    /// Returns whether the classification summary is logged.
    pub fn summary(&self) -> bool {
        self.summary
    }

    /// Returns the passage-time ceiling.
    pub fn passage_ceiling(&self) -> f64 {
        self.passage_ceiling
    }

    /// Validates this configuration.
    ///
    /// The passage ceiling must be finite and positive.
    pub fn validate(&self) -> Result<(), MarkovError> {
        if !self.passage_ceiling.is_finite() || self.passage_ceiling <= 0.0 {
            return Err(MarkovError::InvalidConfig {
                reason: format!(
                    "passage_ceiling must be finite and positive, got {}",
                    self.passage_ceiling
                ),
            });
        }
        Ok(())
    }
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self::new()
    }
}
