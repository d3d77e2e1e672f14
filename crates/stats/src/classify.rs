//! Quantile and user-cutoff discretization.
//!
//! A value is assigned to the first class whose upper bound is greater
//! than or equal to it, so class `i` covers `(bins[i-1], bins[i]]`.

use tracing::warn;

use crate::error::StatsError;
use crate::quantile_type7;

/// Upper class bounds at the `1/k, 2/k, ..., 1` quantiles of `values`.
///
/// Duplicate bounds are merged, so the returned vector may be shorter than
/// `k`; its length is the realized number of classes.
///
/// # Errors
///
/// Returns [`StatsError`] if `values` is empty or non-finite, or if `k` is
/// zero.
pub fn quantile_bins(values: &[f64], k: usize) -> Result<Vec<f64>, StatsError> {
    if k == 0 {
        return Err(StatsError::InvalidClassCount { k });
    }
    if values.is_empty() {
        return Err(StatsError::EmptyData);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFiniteData);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut bins: Vec<f64> = (1..=k)
        .map(|i| {
            let p = if i == k { 1.0 } else { i as f64 / k as f64 };
            quantile_type7(&sorted, p)
        })
        .collect();
    bins.dedup();

    if bins.len() < k {
        warn!(
            requested = k,
            realized = bins.len(),
            "duplicate quantile bounds; fewer classes than requested"
        );
    }
    Ok(bins)
}

/// Class bounds from user cutoffs: the cutoffs followed by `+inf`.
///
/// # Errors
///
/// Returns [`StatsError::InvalidCutoffs`] unless the cutoffs are finite and
/// strictly increasing.
pub fn user_bins(cutoffs: &[f64]) -> Result<Vec<f64>, StatsError> {
    let increasing = cutoffs.windows(2).all(|w| w[0] < w[1]);
    if !increasing || cutoffs.iter().any(|c| !c.is_finite()) {
        return Err(StatsError::InvalidCutoffs {
            cutoffs: cutoffs.to_vec(),
        });
    }
    let mut bins = cutoffs.to_vec();
    bins.push(f64::INFINITY);
    Ok(bins)
}

/// Assigns each value the index of the first bound `>=` the value.
///
/// Values above the last bound fall into the last class.
///
/// # Panics
///
/// Panics if `bins` is empty.
pub fn classify_with_bins(values: &[f64], bins: &[f64]) -> Vec<usize> {
    assert!(!bins.is_empty(), "classify_with_bins: bins must not be empty");
    let last = bins.len() - 1;
    values
        .iter()
        .map(|&v| bins.partition_point(|&b| b < v).min(last))
        .collect()
}
