//! Expected dwell time per state.

use ndarray::Array1;
use tracing::info;

use crate::transition::TransitionMatrix;

/// Sojourn times and the absorbing states among them.
#[derive(Debug, Clone, PartialEq)]
pub struct SojournTimes {
    /// `1 / (1 - p_ii)`, or `+inf` for absorbing states.
    pub times: Array1<f64>,
    /// States with `p_ii == 1`.
    pub absorbing: Vec<usize>,
}

/// Expected number of consecutive periods spent in each state.
///
/// All-zero rows are treated as absorbing.
pub fn sojourn_time(p: &TransitionMatrix) -> SojournTimes {
    let p = p.fill_empty_rows();
    let diag = p.probs().diag();
    let absorbing: Vec<usize> = diag
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 1.0)
        .map(|(i, _)| i)
        .collect();
    let times = diag.mapv(|d| if d == 1.0 { f64::INFINITY } else { 1.0 / (1.0 - d) });
    if !absorbing.is_empty() {
        info!(states = ?absorbing, "sojourn times are infinite for absorbing states");
    }
    SojournTimes { times, absorbing }
}
