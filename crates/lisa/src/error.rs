//! Error types for the geodyn-lisa crate.

use geodyn_markov::MarkovError;
use geodyn_spatial::SpatialError;

/// Error type for all fallible operations in the geodyn-lisa crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LisaError {
    /// Returned when input data is empty.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when a value is NaN or infinite.
    #[error("non-finite value at unit {unit}, period {period}")]
    NonFiniteData {
        /// Row of the offending value.
        unit: usize,
        /// Column of the offending value.
        period: usize,
    },

    /// Returned when a quadrant code is outside `1..=4`.
    #[error("invalid quadrant {value}: expected 1 (HH), 2 (LH), 3 (LL) or 4 (HL)")]
    InvalidQuadrant {
        /// The offending code.
        value: u8,
    },

    /// Returned when two inputs disagree in shape.
    #[error("{field}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the mismatched dimension.
        field: &'static str,
        /// Expected size.
        expected: usize,
        /// Actual size.
        got: usize,
    },

    /// Returned when an operation needs LISA p-values that were not given.
    #[error("no LISA p-values were supplied; significance is unknown")]
    MissingSignificance,

    /// Returned when a permutation alternative is not recognised.
    #[error("unknown alternative {name:?}: expected two.sided, positive or negative")]
    InvalidAlternative {
        /// The rejected name.
        name: String,
    },

    /// Returned when a configuration value is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Markov chain error.
    #[error(transparent)]
    Markov(#[from] MarkovError),

    /// Spatial weights or conditioning error.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
