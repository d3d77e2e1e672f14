//! Statistical helper functions for geodyn.
//!
//! Descriptive statistics, ranking, chi-square tail probabilities and the
//! quantile / user-cutoff discretizer used to turn continuous panels into
//! ordinal classes.

pub mod classify;
mod error;

use statrs::distribution::{ChiSquared, ContinuousCDF};

pub use classify::{classify_with_bins, quantile_bins, user_bins};
pub use error::StatsError;

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().sum();
    sum / data.len() as f64
}

/// Population standard deviation (N denominator). Returns 0.0 if empty.
pub fn std_population(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    (ss / data.len() as f64).sqrt()
}

/// Linear-interpolation quantile (Hyndman & Fan type 7).
///
/// **Expects pre-sorted input** (caller's responsibility).
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    assert!(
        !sorted.is_empty(),
        "quantile_type7: input must not be empty"
    );
    let n = sorted.len();
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - h.floor()) * (sorted[hi] - sorted[lo])
}

/// 1-based ordinal ranks in ascending order.
///
/// Every value gets a distinct rank; ties are broken by order of
/// appearance, so the first of two equal values ranks lower.
pub fn ordinal_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps appearance order among ties.
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0; values.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    ranks
}

/// Upper-tail probability `1 - CDF(stat)` of a chi-square distribution.
///
/// Returns `NaN` when `dof` is zero (the distribution is undefined) or
/// when `stat` is `NaN`.
pub fn chi2_sf(stat: f64, dof: usize) -> f64 {
    if dof == 0 || stat.is_nan() {
        return f64::NAN;
    }
    match ChiSquared::new(dof as f64) {
        Ok(dist) => 1.0 - dist.cdf(stat),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_std_population() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_population(&data), 2.0, epsilon = 1e-12);
        assert_eq!(std_population(&[]), 0.0);
    }

    #[test]
    fn test_quantile_type7() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile_type7(&sorted, 0.25), 2.0, epsilon = 1e-6);
        assert_relative_eq!(quantile_type7(&sorted, 0.5), 3.0, epsilon = 1e-6);
        assert_relative_eq!(quantile_type7(&sorted, 1.0), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn ordinal_ranks_breaks_ties_by_position() {
        let ranks = ordinal_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3, 1, 4, 2]);
    }

    #[test]
    fn ordinal_ranks_empty() {
        assert!(ordinal_ranks(&[]).is_empty());
    }

    #[test]
    fn chi2_sf_known_values() {
        // Median of chi2(2) is 2 ln 2.
        assert_relative_eq!(chi2_sf(2.0 * 2.0_f64.ln(), 2), 0.5, epsilon = 1e-9);
        assert_relative_eq!(chi2_sf(0.0, 3), 1.0, epsilon = 1e-12);
        assert!(chi2_sf(1e4, 5) < 1e-12);
    }

    #[test]
    fn chi2_sf_zero_dof_is_nan() {
        assert!(chi2_sf(3.0, 0).is_nan());
    }
}
