//! Decomposition of a chain into communicating classes.

use std::collections::VecDeque;
use std::fmt::Write as _;

use ndarray::Array2;

use crate::error::MarkovError;
use crate::transition::TransitionMatrix;

/// Whether a communicating class can be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// No positive-probability transition leaves the class.
    Recurrent,
    /// Some state of the class moves outside it with positive probability.
    Transient,
}

/// A maximal set of mutually reachable states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicatingClass {
    states: Vec<usize>,
    kind: ClassKind,
}

impl CommunicatingClass {
    /// Member states in ascending order.
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// Recurrent or transient.
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Returns `true` for a recurrent class.
    pub fn is_recurrent(&self) -> bool {
        self.kind == ClassKind::Recurrent
    }

    /// Returns `true` if `state` belongs to this class.
    pub fn contains(&self, state: usize) -> bool {
        self.states.binary_search(&state).is_ok()
    }
}

/// Partition of a chain's states into communicating classes.
///
/// Classes are ordered by their smallest member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    k: usize,
    classes: Vec<CommunicatingClass>,
    absorbing: Vec<usize>,
}

impl Classification {
    /// Number of states.
    pub fn k(&self) -> usize {
        self.k
    }

    /// All communicating classes.
    pub fn classes(&self) -> &[CommunicatingClass] {
        &self.classes
    }

    /// Recurrent classes, in class order.
    pub fn recurrent(&self) -> impl Iterator<Item = &CommunicatingClass> {
        self.classes.iter().filter(|c| c.is_recurrent())
    }

    /// Transient classes, in class order.
    pub fn transient(&self) -> impl Iterator<Item = &CommunicatingClass> {
        self.classes.iter().filter(|c| !c.is_recurrent())
    }

    /// States whose self-transition probability is exactly 1.
    pub fn absorbing(&self) -> &[usize] {
        &self.absorbing
    }

    /// Returns `true` if the chain has a single communicating class.
    pub fn is_irreducible(&self) -> bool {
        self.classes.len() == 1
    }

    /// Human-readable description of the decomposition.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let kind = if self.is_irreducible() {
            "irreducible"
        } else {
            "reducible"
        };
        let _ = writeln!(out, "Markov chain is {kind}");
        let recurrent: Vec<_> = self.recurrent().collect();
        let transient: Vec<_> = self.transient().collect();
        let _ = writeln!(
            out,
            "recurrent classes ({}): {}",
            recurrent.len(),
            render_classes(&recurrent)
        );
        let _ = writeln!(
            out,
            "transient classes ({}): {}",
            transient.len(),
            render_classes(&transient)
        );
        let _ = write!(
            out,
            "absorbing states ({}): {:?}",
            self.absorbing.len(),
            self.absorbing
        );
        out
    }
}

fn render_classes(classes: &[&CommunicatingClass]) -> String {
    classes
        .iter()
        .map(|c| format!("{:?}", c.states()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Boolean reachability: `reach[[i, j]]` iff `j` is reachable from `i` in
/// zero or more positive-probability steps.
pub(crate) fn reachability(p: &Array2<f64>) -> Array2<bool> {
    let k = p.nrows();
    let mut reach = Array2::from_elem((k, k), false);
    let mut queue = VecDeque::new();
    for start in 0..k {
        reach[[start, start]] = true;
        queue.push_back(start);
        while let Some(i) = queue.pop_front() {
            for j in 0..k {
                if p[[i, j]] > 0.0 && !reach[[start, j]] {
                    reach[[start, j]] = true;
                    queue.push_back(j);
                }
            }
        }
    }
    reach
}

/// Decomposes a stochastic matrix into communicating classes.
///
/// # Errors
///
/// Returns [`MarkovError::UnnormalizableMatrix`] if the matrix still has
/// zero rows.
pub fn classify_chain(p: &TransitionMatrix) -> Result<Classification, MarkovError> {
    let empty = p.empty_rows();
    if !empty.is_empty() {
        return Err(MarkovError::UnnormalizableMatrix { rows: empty.len() });
    }
    let probs = p.probs();
    let k = p.k();
    let reach = reachability(probs);

    let mut assigned = vec![false; k];
    let mut classes = Vec::new();
    for i in 0..k {
        if assigned[i] {
            continue;
        }
        let states: Vec<usize> = (0..k)
            .filter(|&j| reach[[i, j]] && reach[[j, i]])
            .collect();
        for &s in &states {
            assigned[s] = true;
        }
        let leaks = states.iter().any(|&s| {
            (0..k).any(|j| probs[[s, j]] > 0.0 && states.binary_search(&j).is_err())
        });
        let kind = if leaks {
            ClassKind::Transient
        } else {
            ClassKind::Recurrent
        };
        classes.push(CommunicatingClass { states, kind });
    }

    let absorbing = (0..k).filter(|&i| probs[[i, i]] == 1.0).collect();
    Ok(Classification {
        k,
        classes,
        absorbing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn irreducible_chain_has_one_recurrent_class() {
        let p = TransitionMatrix::new(array![
            [0.5, 0.25, 0.25],
            [0.5, 0.0, 0.5],
            [0.25, 0.25, 0.5]
        ])
        .unwrap();
        let c = classify_chain(&p).unwrap();
        assert!(c.is_irreducible());
        assert_eq!(c.classes()[0].states(), &[0, 1, 2]);
        assert!(c.classes()[0].is_recurrent());
        assert!(c.absorbing().is_empty());
    }

    #[test]
    fn reducible_chain_with_absorbing_state() {
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.2, 0.8, 0.0], [0.0, 0.0, 1.0]])
            .unwrap();
        let c = classify_chain(&p).unwrap();
        assert!(!c.is_irreducible());
        let recurrent: Vec<_> = c.recurrent().map(|c| c.states().to_vec()).collect();
        assert_eq!(recurrent, vec![vec![0, 1], vec![2]]);
        assert_eq!(c.transient().count(), 0);
        assert_eq!(c.absorbing(), &[2]);
    }

    #[test]
    fn transient_class_detected() {
        // State 0 leaks into the closed class {1, 2}.
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.0, 0.5, 0.5], [0.0, 0.5, 0.5]])
            .unwrap();
        let c = classify_chain(&p).unwrap();
        assert_eq!(c.classes().len(), 2);
        assert_eq!(c.classes()[0].states(), &[0]);
        assert_eq!(c.classes()[0].kind(), ClassKind::Transient);
        assert!(c.classes()[1].contains(2));
        assert!(c.classes()[1].is_recurrent());
    }

    #[test]
    fn zero_rows_rejected() {
        let p = TransitionMatrix::new(array![[1.0, 0.0], [0.0, 0.0]]).unwrap();
        assert!(matches!(
            classify_chain(&p),
            Err(MarkovError::UnnormalizableMatrix { rows: 1 })
        ));
    }

    #[test]
    fn summary_mentions_absorbing_states() {
        let p = TransitionMatrix::new(array![[0.5, 0.5, 0.0], [0.2, 0.8, 0.0], [0.0, 0.0, 1.0]])
            .unwrap();
        let text = classify_chain(&p).unwrap().summary();
        assert!(text.starts_with("Markov chain is reducible"));
        assert!(text.contains("recurrent classes (2): [0, 1] [2]"));
        assert!(text.contains("absorbing states (1): [2]"));
    }
}
