//! Discretization of continuous panels into class ids.

use geodyn_stats::classify::{classify_with_bins, quantile_bins, user_bins};
use ndarray::{Array2, ArrayView2, Axis};
use tracing::debug;

use crate::config::QuantileScope;
use crate::error::SpatialError;

/// Class ids of an `n x t` panel together with the realized class count.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretized {
    /// Class id per unit and period, in `0..k`.
    pub ids: Array2<usize>,
    /// Number of classes actually produced.
    pub k: usize,
    /// Upper class bounds without the last one, when a single set of bounds
    /// applies to every period.
    pub cutoffs: Option<Vec<f64>>,
}

/// Classifies `y` into `k` quantile classes, or by explicit `cutoffs`.
///
/// With pooled quantiles, duplicate bounds shrink the realized `k`. With
/// per-period quantiles the requested `k` is kept and no cutoffs are
/// returned. Explicit cutoffs yield `cutoffs.len() + 1` classes, the last
/// one open-ended.
///
/// # Errors
///
/// Returns [`SpatialError::Stats`] for empty or non-finite data, a zero
/// class count, or cutoffs that are not strictly increasing.
pub fn discretize(
    y: ArrayView2<'_, f64>,
    k: usize,
    scope: QuantileScope,
    cutoffs: Option<&[f64]>,
) -> Result<Discretized, SpatialError> {
    if y.is_empty() {
        return Err(SpatialError::EmptyData);
    }

    if let Some(cutoffs) = cutoffs {
        let bins = user_bins(cutoffs)?;
        return Ok(Discretized {
            ids: classify_pooled(y, &bins)?,
            k: bins.len(),
            cutoffs: Some(cutoffs.to_vec()),
        });
    }

    match scope {
        QuantileScope::Pooled => {
            let values: Vec<f64> = y.iter().copied().collect();
            let mut bins = quantile_bins(&values, k)?;
            let ids = classify_pooled(y, &bins)?;
            let realized = bins.len();
            bins.pop();
            debug!(requested = k, realized, "pooled quantile classes");
            Ok(Discretized {
                ids,
                k: realized,
                cutoffs: Some(bins),
            })
        }
        QuantileScope::PerPeriod => {
            let mut ids = Array2::zeros(y.raw_dim());
            for (t, column) in y.axis_iter(Axis(1)).enumerate() {
                let values = column.to_vec();
                let bins = quantile_bins(&values, k)?;
                for (i, id) in classify_with_bins(&values, &bins).into_iter().enumerate() {
                    ids[[i, t]] = id;
                }
            }
            Ok(Discretized {
                ids,
                k,
                cutoffs: None,
            })
        }
    }
}

fn classify_pooled(y: ArrayView2<'_, f64>, bins: &[f64]) -> Result<Array2<usize>, SpatialError> {
    let values: Vec<f64> = y.iter().copied().collect();
    let ids = classify_with_bins(&values, bins);
    Array2::from_shape_vec(y.raw_dim(), ids).map_err(|_| SpatialError::ShapeMismatch {
        field: "class ids",
        expected: y.len(),
        got: values.len(),
    })
}
