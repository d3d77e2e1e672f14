//! Mean first passage times and their variances.
//!
//! Ergodic chains use the fundamental-matrix closed form. Reducible chains
//! solve one absorbing-destination system per state, after removing the
//! states from which the destination is not reached with certainty, and
//! then overwrite each recurrent class block with the closed form on that
//! class.

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::classes::{Classification, classify_chain, reachability};
use crate::error::MarkovError;
use crate::linalg::{inverse, solve, stationary_vector};
use crate::transition::TransitionMatrix;

/// Passage times larger than this in magnitude are reported as `+inf`.
pub const DEFAULT_PASSAGE_CEILING: f64 = 1e16;

/// Stationary vector, fundamental matrix and MFPT of an irreducible chain.
struct ErgodicParts {
    pi: Array1<f64>,
    z: Array2<f64>,
    m: Array2<f64>,
}

fn ergodic_parts(p: &Array2<f64>) -> Result<ErgodicParts, MarkovError> {
    let k = p.nrows();
    let pi = stationary_vector(p)?;
    let fundamental = Array2::from_shape_fn((k, k), |(i, j)| {
        let delta = if i == j { 1.0 } else { 0.0 };
        delta - p[[i, j]] + pi[j]
    });
    let z = inverse(&fundamental, "fundamental matrix")?;
    let m = Array2::from_shape_fn((k, k), |(i, j)| {
        let delta = if i == j { 1.0 } else { 0.0 };
        let d = if pi[j] == 0.0 { 1.0 } else { 1.0 / pi[j] };
        (delta - z[[i, j]] + z[[j, j]]) * d
    });
    Ok(ErgodicParts { pi, z, m })
}

fn require_ergodic(p: &TransitionMatrix) -> Result<(), MarkovError> {
    let classification = classify_chain(p)?;
    if !classification.is_irreducible() {
        return Err(MarkovError::NotErgodic {
            classes: classification.classes().len(),
        });
    }
    Ok(())
}

/// Fundamental matrix `Z = (I - P + A)^-1` of an ergodic chain, where every
/// row of `A` is the stationary distribution.
///
/// # Errors
///
/// Returns [`MarkovError::NotErgodic`] for reducible chains and
/// [`MarkovError::UnnormalizableMatrix`] if `p` has zero rows.
pub fn fundamental_matrix(p: &TransitionMatrix) -> Result<Array2<f64>, MarkovError> {
    require_ergodic(p)?;
    Ok(ergodic_parts(p.probs())?.z)
}

/// Mean first passage times of `p`.
///
/// Entry `(i, j)` is the expected number of steps for a chain started in `i`
/// to first reach `j`; the diagonal holds recurrence times. Unreachable
/// destinations are `+inf`.
///
/// # Errors
///
/// Returns [`MarkovError::UnnormalizableMatrix`] if `p` has zero rows and
/// `fill_empty_classes` is false.
pub fn mfpt(p: &TransitionMatrix, fill_empty_classes: bool) -> Result<Array2<f64>, MarkovError> {
    let p = p.require_stochastic(fill_empty_classes)?;
    let classification = classify_chain(&p)?;
    mfpt_with(&p, &classification, DEFAULT_PASSAGE_CEILING)
}

/// Mean first passage times of a stochastic `p` with a known decomposition.
///
/// Entries whose magnitude exceeds `ceiling` are clamped to `+inf`.
#[tracing::instrument(skip(p, classification), fields(k = p.k()))]
pub fn mfpt_with(
    p: &TransitionMatrix,
    classification: &Classification,
    ceiling: f64,
) -> Result<Array2<f64>, MarkovError> {
    let mut m = if classification.is_irreducible() {
        ergodic_parts(p.probs())?.m
    } else {
        let mut m = Array2::from_elem((p.k(), p.k()), f64::INFINITY);
        let reach = reachability(p.probs());
        for destination in 0..p.k() {
            let column = passage_to(p.probs(), &reach, destination)?;
            m.column_mut(destination).assign(&column);
        }
        for class in classification.recurrent() {
            let states = class.states();
            let block = ergodic_parts(p.submatrix(states).probs())?.m;
            for (a, &i) in states.iter().enumerate() {
                for (b, &j) in states.iter().enumerate() {
                    m[[i, j]] = block[[a, b]];
                }
            }
        }
        m
    };

    let mut clamped = 0usize;
    m.mapv_inplace(|x| {
        if x.is_finite() && x.abs() > ceiling {
            clamped += 1;
            f64::INFINITY
        } else {
            x
        }
    });
    if clamped > 0 {
        warn!(clamped, ceiling, "near-singular passage times reported as infinite");
    }
    Ok(m)
}

/// Column `destination` of the MFPT matrix of a (possibly reducible) chain.
///
/// States that cannot reach the destination are excluded first; the set is
/// then grown by every state with a positive link into it until it stops
/// changing. The remaining states all reach the destination with
/// certainty, so `(I - P)` restricted to them is non-singular.
fn passage_to(
    p: &Array2<f64>,
    reach: &Array2<bool>,
    destination: usize,
) -> Result<Array1<f64>, MarkovError> {
    let k = p.nrows();
    let others: Vec<usize> = (0..k).filter(|&i| i != destination).collect();

    let mut excluded = vec![false; k];
    for &i in &others {
        excluded[i] = !reach[[i, destination]];
    }
    let seed = excluded.iter().filter(|&&e| e).count();
    loop {
        let mut grew = false;
        for &i in &others {
            if !excluded[i] && others.iter().any(|&j| excluded[j] && p[[i, j]] > 0.0) {
                excluded[i] = true;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let active: Vec<usize> = others.iter().copied().filter(|&i| !excluded[i]).collect();
    debug!(
        destination,
        unreachable = seed,
        excluded = k - 1 - active.len(),
        "first-passage system reduced"
    );

    let mut times = Array1::from_elem(k, f64::INFINITY);
    if !active.is_empty() {
        let n = active.len();
        let system = Array2::from_shape_fn((n, n), |(a, b)| {
            let delta = if a == b { 1.0 } else { 0.0 };
            delta - p[[active[a], active[b]]]
        });
        let solution = solve(&system, &Array1::ones(n))
            .ok_or(MarkovError::SingularPassageSystem { destination })?;
        for (&state, &t) in active.iter().zip(solution.iter()) {
            times[state] = t;
        }
    }

    // Recurrence time; zero-probability successors contribute nothing even
    // when their passage time is infinite.
    let recurrence = 1.0
        + others
            .iter()
            .filter(|&&j| p[[destination, j]] > 0.0)
            .map(|&j| p[[destination, j]] * times[j])
            .sum::<f64>();
    times[destination] = recurrence;
    Ok(times)
}

/// Variances of the mean first passage times of an ergodic chain.
///
/// With `M` the MFPT matrix, `Z` the fundamental matrix and `D` the
/// diagonal of inverse stationary probabilities,
/// `W = M (2 Z_dg D - I) + 2 (Z M - E (Z M)_dg)` and the result is
/// `W - M o M`.
///
/// # Errors
///
/// Returns [`MarkovError::NotErgodic`] for reducible chains and
/// [`MarkovError::UnnormalizableMatrix`] if `p` has zero rows.
pub fn var_mfpt_ergodic(p: &TransitionMatrix) -> Result<Array2<f64>, MarkovError> {
    require_ergodic(p)?;
    let ErgodicParts { pi, z, m } = ergodic_parts(p.probs())?;
    let k = p.k();

    let mut x = Array2::zeros((k, k));
    for i in 0..k {
        x[[i, i]] = 2.0 * z[[i, i]] / pi[i] - 1.0;
    }
    let zm = z.dot(&m);
    let mut w = m.dot(&x);
    for i in 0..k {
        for j in 0..k {
            w[[i, j]] += 2.0 * (zm[[i, j]] - zm[[j, j]]);
        }
    }
    Ok(w - &m.mapv(|v| v * v))
}
