//! Neighbor structures and spatial lag operators.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::SpatialError;

/// A neighbor relation over units `0..n` with per-link weights.
///
/// Implementors supply the adjacency; the lag operators are provided.
pub trait SpatialWeights: Sync {
    /// Number of units.
    fn n(&self) -> usize;

    /// Neighbors of unit `i`.
    fn neighbors(&self, i: usize) -> &[usize];

    /// Weights of unit `i`'s links, aligned with [`neighbors`](Self::neighbors).
    fn weights(&self, i: usize) -> &[f64];

    /// Weighted sum of neighbor values for every unit.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::ShapeMismatch`] if `values` does not have one
    /// entry per unit.
    fn lag(&self, values: ArrayView1<'_, f64>) -> Result<Array1<f64>, SpatialError> {
        check_units(self.n(), values.len())?;
        Ok((0..self.n())
            .map(|i| {
                self.neighbors(i)
                    .iter()
                    .zip(self.weights(i))
                    .map(|(&j, &w)| w * values[j])
                    .sum()
            })
            .collect())
    }

    /// [`lag`](Self::lag) applied to every period (column) of an `n x t` panel.
    fn lag_panel(&self, y: ArrayView2<'_, f64>) -> Result<Array2<f64>, SpatialError> {
        check_units(self.n(), y.nrows())?;
        let mut out = Array2::zeros(y.raw_dim());
        for (t, column) in y.axis_iter(Axis(1)).enumerate() {
            out.column_mut(t).assign(&self.lag(column)?);
        }
        Ok(out)
    }

    /// Weighted majority label among each unit's neighbors, per period.
    ///
    /// Ties go to the unit's own label when it is among the tied labels and
    /// to the smallest tied label otherwise. Units without neighbors keep
    /// their own label.
    fn lag_categorical(&self, ids: ArrayView2<'_, usize>) -> Result<Array2<usize>, SpatialError> {
        check_units(self.n(), ids.nrows())?;
        let mut out = Array2::zeros(ids.raw_dim());
        let mut tally: BTreeMap<usize, f64> = BTreeMap::new();
        for ((i, t), own) in ids.indexed_iter() {
            tally.clear();
            for (&j, &w) in self.neighbors(i).iter().zip(self.weights(i)) {
                *tally.entry(ids[[j, t]]).or_insert(0.0) += w;
            }
            let best = tally.values().copied().fold(f64::NEG_INFINITY, f64::max);
            let winner = if tally.is_empty() {
                *own
            } else if tally.get(own).is_some_and(|&w| w == best) {
                *own
            } else {
                // BTreeMap iterates labels in ascending order.
                tally
                    .iter()
                    .find(|(_, w)| **w == best)
                    .map_or(*own, |(&label, _)| label)
            };
            out[[i, t]] = winner;
        }
        Ok(out)
    }
}

fn check_units(n: usize, got: usize) -> Result<(), SpatialError> {
    if n != got {
        return Err(SpatialError::ShapeMismatch {
            field: "units",
            expected: n,
            got,
        });
    }
    Ok(())
}

/// Adjacency lists with row-standardized weights.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    neighbors: Vec<Vec<usize>>,
    weights: Vec<Vec<f64>>,
}

impl NeighborList {
    /// Binary contiguity lists, row-standardized so each unit's weights sum
    /// to 1.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnknownUnit`] if a list names a unit outside
    /// `0..n`.
    pub fn new(neighbors: Vec<Vec<usize>>) -> Result<Self, SpatialError> {
        let weighted = neighbors
            .into_iter()
            .map(|list| list.into_iter().map(|j| (j, 1.0)).collect())
            .collect();
        Self::from_weighted(weighted)
    }

    /// General weighted lists, row-standardized.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if a neighbor is outside `0..n` or a weight
    /// is negative or non-finite.
    pub fn from_weighted(lists: Vec<Vec<(usize, f64)>>) -> Result<Self, SpatialError> {
        let n = lists.len();
        if n == 0 {
            return Err(SpatialError::EmptyData);
        }
        let mut neighbors = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        for (unit, list) in lists.into_iter().enumerate() {
            for &(neighbor, weight) in &list {
                if neighbor >= n {
                    return Err(SpatialError::UnknownUnit { unit, neighbor, n });
                }
                if !weight.is_finite() || weight < 0.0 {
                    return Err(SpatialError::InvalidWeight {
                        unit,
                        neighbor,
                        weight,
                    });
                }
            }
            let total: f64 = list.iter().map(|(_, w)| w).sum();
            let (ids, ws): (Vec<usize>, Vec<f64>) = list
                .into_iter()
                .map(|(j, w)| (j, if total > 0.0 { w / total } else { 0.0 }))
                .unzip();
            neighbors.push(ids);
            weights.push(ws);
        }
        Ok(Self { neighbors, weights })
    }

    /// Rook contiguity on a `rows x cols` grid, units numbered row-major.
    pub fn lattice(rows: usize, cols: usize) -> Result<Self, SpatialError> {
        let mut lists = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let mut list = Vec::with_capacity(4);
                if r > 0 {
                    list.push((r - 1) * cols + c);
                }
                if c > 0 {
                    list.push(r * cols + c - 1);
                }
                if c + 1 < cols {
                    list.push(r * cols + c + 1);
                }
                if r + 1 < rows {
                    list.push((r + 1) * cols + c);
                }
                lists.push(list);
            }
        }
        Self::new(lists)
    }

    /// Units without neighbors.
    pub fn islands(&self) -> Vec<usize> {
        (0..self.neighbors.len())
            .filter(|&i| self.neighbors[i].is_empty())
            .collect()
    }
}

impl SpatialWeights for NeighborList {
    fn n(&self) -> usize {
        self.neighbors.len()
    }

    fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    fn weights(&self, i: usize) -> &[f64] {
        &self.weights[i]
    }
}
