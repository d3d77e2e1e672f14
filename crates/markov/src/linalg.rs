//! Dense linear algebra on transition matrices.
//!
//! Arrays are held as `ndarray` types throughout the crate and copied into
//! `nalgebra::DMatrix` for the eigen, SVD, inverse and LU work.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::error::MarkovError;

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Stationary vector of an irreducible stochastic matrix.
///
/// Picks the eigenvalue of `P'` closest to 1, takes the null vector of
/// `P' - lambda I` from the SVD, and normalizes its absolute values to sum
/// to 1.
pub(crate) fn stationary_vector(p: &Array2<f64>) -> Result<Array1<f64>, MarkovError> {
    let k = p.nrows();
    if k == 1 {
        return Ok(Array1::ones(1));
    }
    let pt = to_dmatrix(p).transpose();

    let lambda = pt
        .complex_eigenvalues()
        .iter()
        .map(|ev| (ev.re, (ev.re - 1.0).hypot(ev.im)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(re, _)| re)
        .ok_or(MarkovError::SingularMatrix {
            context: "steady state eigenvalues",
        })?;

    let shifted = pt - DMatrix::identity(k, k) * lambda;
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t.ok_or(MarkovError::SingularMatrix {
        context: "steady state null space",
    })?;
    // Singular values are not assumed to be sorted.
    let null = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(k - 1);

    let v: Array1<f64> = (0..k).map(|j| v_t[(null, j)].abs()).collect();
    let total = v.sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(MarkovError::SingularMatrix {
            context: "steady state normalization",
        });
    }
    Ok(v / total)
}

/// Inverse of a square matrix.
pub(crate) fn inverse(a: &Array2<f64>, context: &'static str) -> Result<Array2<f64>, MarkovError> {
    to_dmatrix(a)
        .try_inverse()
        .map(|inv| from_dmatrix(&inv))
        .ok_or(MarkovError::SingularMatrix { context })
}

/// Solves `a x = b` by LU decomposition. `None` if `a` is singular.
pub(crate) fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let rhs = DVector::from_iterator(b.len(), b.iter().copied());
    let x = to_dmatrix(a).lu().solve(&rhs)?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(x.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn stationary_vector_of_weather_chain() {
        let p = array![[0.5, 0.25, 0.25], [0.5, 0.0, 0.5], [0.25, 0.25, 0.5]];
        let pi = stationary_vector(&p).unwrap();
        assert_abs_diff_eq!(pi[0], 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(pi[1], 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(pi[2], 0.4, epsilon = 1e-9);
    }

    #[test]
    fn stationary_vector_of_single_state() {
        let pi = stationary_vector(&array![[1.0]]).unwrap();
        assert_eq!(pi, array![1.0]);
    }

    #[test]
    fn inverse_round_trip() {
        let a = array![[4.0, 7.0], [2.0, 6.0]];
        let inv = inverse(&a, "test").unwrap();
        let id = a.dot(&inv);
        assert_abs_diff_eq!(id[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_inverse_errors() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            inverse(&a, "test"),
            Err(MarkovError::SingularMatrix { context: "test" })
        ));
    }

    #[test]
    fn solve_small_system() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let x = solve(&a, &array![1.0, 1.0]).unwrap();
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.25, epsilon = 1e-12);
        assert!(solve(&array![[0.0, 0.0], [0.0, 1.0]], &array![1.0, 1.0]).is_none());
    }
}
