//! Error types for the geodyn-stats crate.

/// Error type for all fallible operations in the geodyn-stats crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatsError {
    /// Returned when input data is empty.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when input contains NaN or infinity.
    #[error("input data contains non-finite values")]
    NonFiniteData,

    /// Returned when the requested number of classes is zero.
    #[error("invalid class count: {k} (must be at least 1)")]
    InvalidClassCount {
        /// The requested class count.
        k: usize,
    },

    /// Returned when user cutoffs are not strictly increasing.
    #[error("cutoffs must be finite and strictly increasing, got {cutoffs:?}")]
    InvalidCutoffs {
        /// The offending cutoffs.
        cutoffs: Vec<f64>,
    },
}
