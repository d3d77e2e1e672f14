//! Error types for the geodyn-spatial crate.

use geodyn_markov::MarkovError;
use geodyn_stats::StatsError;

/// Error type for all fallible operations in the geodyn-spatial crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpatialError {
    /// Returned when input data is empty.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when an input does not match the number of units or periods.
    #[error("{field}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the mismatched dimension.
        field: &'static str,
        /// Expected size.
        expected: usize,
        /// Actual size.
        got: usize,
    },

    /// Returned when a neighbor list names a unit outside `0..n`.
    #[error("unit {unit} lists neighbor {neighbor}, but there are only {n} units")]
    UnknownUnit {
        /// Unit whose list is invalid.
        unit: usize,
        /// Offending neighbor index.
        neighbor: usize,
        /// Number of units.
        n: usize,
    },

    /// Returned when a neighbor weight is negative or non-finite.
    #[error("invalid weight {weight} between unit {unit} and neighbor {neighbor}")]
    InvalidWeight {
        /// Unit whose list is invalid.
        unit: usize,
        /// Neighbor index.
        neighbor: usize,
        /// The offending weight.
        weight: f64,
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

    /// Statistics error.
    #[error(transparent)]
    Stats(#[from] StatsError),
}
