//! Error types for the geodyn-markov crate.

use geodyn_stats::StatsError;

/// Error type for all fallible operations in the geodyn-markov crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarkovError {
    /// Returned when input data is empty.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when a panel has too few periods to form a transition.
    #[error("insufficient periods: got {t}, need at least {min}")]
    InsufficientPeriods {
        /// Number of periods provided.
        t: usize,
        /// Minimum required.
        min: usize,
    },

    /// Returned when a matrix expected to be square is not.
    #[error("matrix is not square: {rows} rows, {cols} columns")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// Returned when two inputs disagree on a dimension.
    #[error("{field}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the mismatched dimension.
        field: &'static str,
        /// Expected size.
        expected: usize,
        /// Actual size.
        got: usize,
    },

    /// Returned when an observed label is absent from an explicit class list.
    #[error("label at unit {unit}, period {period} is not one of the declared classes")]
    UnknownLabel {
        /// Row of the offending label.
        unit: usize,
        /// Column of the offending label.
        period: usize,
    },

    /// Returned when a probability or count is negative.
    #[error("negative entry at ({row}, {col}): {value}")]
    NegativeEntry {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The negative value.
        value: f64,
    },

    /// Returned when a matrix entry is NaN or infinite.
    #[error("non-finite entry at ({row}, {col})")]
    NonFiniteEntry {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    /// Returned when a row sums to neither 0 nor 1.
    #[error("malformed transition matrix: row {row} sums to {sum}, expected 0 or 1")]
    MalformedMatrix {
        /// Row index.
        row: usize,
        /// Observed row sum.
        sum: f64,
    },

    /// Returned when zero rows are present and repair was not requested.
    #[error(
        "input transition probability matrix has {rows} rows full of 0s; \
         enable fill_empty_classes to set their diagonal elements to 1"
    )]
    UnnormalizableMatrix {
        /// Number of all-zero rows.
        rows: usize,
    },

    /// Returned when an operation requires an irreducible chain.
    #[error("chain is not ergodic: {classes} communicating classes")]
    NotErgodic {
        /// Number of communicating classes found.
        classes: usize,
    },

    /// Returned when a dense solve or inversion hits a singular matrix.
    #[error("singular matrix in {context}")]
    SingularMatrix {
        /// Which computation failed.
        context: &'static str,
    },

    /// Returned when the first-passage system for a destination stays
    /// singular after removing states that cannot reach it.
    #[error("first-passage system for destination {destination} is singular")]
    SingularPassageSystem {
        /// Destination state index.
        destination: usize,
    },

    /// Returned when a configuration value is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Statistics error.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_empty_data() {
        assert_eq!(MarkovError::EmptyData.to_string(), "input data is empty");
    }

    #[test]
    fn error_insufficient_periods() {
        let e = MarkovError::InsufficientPeriods { t: 1, min: 2 };
        assert_eq!(e.to_string(), "insufficient periods: got 1, need at least 2");
    }

    #[test]
    fn error_shape_mismatch() {
        let e = MarkovError::ShapeMismatch {
            field: "lag rows",
            expected: 10,
            got: 9,
        };
        assert_eq!(e.to_string(), "lag rows: expected 10, got 9");
    }

    #[test]
    fn error_malformed_matrix() {
        let e = MarkovError::MalformedMatrix { row: 2, sum: 1.5 };
        assert_eq!(
            e.to_string(),
            "malformed transition matrix: row 2 sums to 1.5, expected 0 or 1"
        );
    }

    #[test]
    fn error_unnormalizable_reports_row_count() {
        let e = MarkovError::UnnormalizableMatrix { rows: 1 };
        assert!(e.to_string().starts_with(
            "input transition probability matrix has 1 rows full of 0s"
        ));
    }

    #[test]
    fn error_singular_passage_system() {
        let e = MarkovError::SingularPassageSystem { destination: 3 };
        assert_eq!(
            e.to_string(),
            "first-passage system for destination 3 is singular"
        );
    }

    #[test]
    fn from_stats_error() {
        let e: MarkovError = StatsError::EmptyData.into();
        assert!(matches!(e, MarkovError::Stats(_)));
        assert_eq!(e.to_string(), "input data is empty");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<MarkovError>();
    }
}
