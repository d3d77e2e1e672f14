//! Configuration for LISA Markov chains and rose diagrams.

use crate::error::LisaError;

/// Configuration for [`LisaMarkov`](crate::LisaMarkov).
#[derive(Clone, Debug)]
pub struct LisaConfig {
    significance_level: f64,
}

impl LisaConfig {
    /// Creates a new configuration with a significance level of `0.05`.
    pub fn new() -> Self {
        Self {
            significance_level: 0.05,
        }
    }

    /// Sets the level at or below which a LISA p-value is significant.
    pub fn with_significance_level(mut self, level: f64) -> Self {
        self.significance_level = level;
        self
    }

    /// Returns the significance level.
    pub fn significance_level(&self) -> f64 {
        self.significance_level
    }

    /// Validates this configuration.
    ///
    /// The significance level must lie in `(0, 1]`.
    pub fn validate(&self) -> Result<(), LisaError> {
        let level = self.significance_level;
        if !(level > 0.0 && level <= 1.0) {
            return Err(LisaError::InvalidConfig {
                reason: format!("significance_level must be in (0, 1], got {level}"),
            });
        }
        Ok(())
    }
}

impl Default for LisaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for [`Rose`](crate::Rose).
#[derive(Clone, Debug)]
pub struct RoseConfig {
    k: usize,
}

impl RoseConfig {
    /// Creates a new configuration with 8 sectors.
    pub fn new() -> Self {
        Self { k: 8 }
    }

    /// Sets the number of circular sectors.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Returns the number of circular sectors.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), LisaError> {
        if self.k == 0 {
            return Err(LisaError::InvalidConfig {
                reason: "k must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RoseConfig {
    fn default() -> Self {
        Self::new()
    }
}
