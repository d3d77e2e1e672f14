//! Detection of locations joining existing LISA clusters.
//!
//! A cluster graph for one period links every core location (significant
//! and in the quadrant of interest) to its neighbors, and optionally each
//! such neighbor to its own neighbors. A location spills over between two
//! periods when it is in the later graph but not the earlier one, and its
//! later component reaches a location of the earlier graph.

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use geodyn_spatial::SpatialWeights;

use crate::error::LisaError;

/// Union-Find (disjoint set) for connected component tracking.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

/// Cluster graph of one period.
struct ClusterGraph {
    member: Vec<bool>,
    sets: UnionFind,
}

impl ClusterGraph {
    fn build<W: SpatialWeights>(cores: impl Iterator<Item = bool>, neighbors_on: bool, w: &W) -> Self {
        let n = w.n();
        let mut graph = Self {
            member: vec![false; n],
            sets: UnionFind::new(n),
        };
        for (i, core) in cores.enumerate() {
            if !core {
                continue;
            }
            for &j in w.neighbors(i) {
                graph.link(i, j);
                if neighbors_on {
                    for &nn in w.neighbors(j) {
                        graph.link(j, nn);
                    }
                }
            }
        }
        graph
    }

    fn link(&mut self, a: usize, b: usize) {
        self.member[a] = true;
        self.member[b] = true;
        self.sets.union(a, b);
    }

    /// Component ids from 1, ordered by smallest member; 0 outside the graph.
    fn labels(&mut self) -> Vec<usize> {
        let n = self.member.len();
        let mut by_root = vec![0usize; n];
        let mut next = 0;
        let mut labels = vec![0; n];
        for i in 0..n {
            if !self.member[i] {
                continue;
            }
            let root = self.sets.find(i);
            if by_root[root] == 0 {
                next += 1;
                by_root[root] = next;
            }
            labels[i] = by_root[root];
        }
        labels
    }
}

/// Cluster membership and spillover flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Spillover {
    /// Component id of every unit and period (`n x t`), numbered from 1 in
    /// order of each component's smallest unit; 0 outside any cluster.
    pub components: Array2<usize>,
    /// 1 where a unit joined an existing cluster between periods `t` and
    /// `t+1` (`n x t-1`).
    pub spill_over: Array2<u8>,
}

/// Builds the per-period cluster graphs of `cores` (`n x t`) and flags
/// spillover between consecutive periods.
///
/// # Errors
///
/// Returns [`LisaError::ShapeMismatch`] if `cores` does not have one row
/// per unit of `w`.
pub fn detect_spillover<W: SpatialWeights>(
    cores: ArrayView2<'_, bool>,
    neighbors_on: bool,
    w: &W,
) -> Result<Spillover, LisaError> {
    let (n, t) = cores.dim();
    if n != w.n() {
        return Err(LisaError::ShapeMismatch {
            field: "units",
            expected: w.n(),
            got: n,
        });
    }

    let mut graphs: Vec<ClusterGraph> = cores
        .columns()
        .into_iter()
        .map(|column| ClusterGraph::build(column.iter().copied(), neighbors_on, w))
        .collect();

    let mut components = Array2::zeros((n, t));
    for (period, graph) in graphs.iter_mut().enumerate() {
        for (i, label) in graph.labels().into_iter().enumerate() {
            components[[i, period]] = label;
        }
    }

    let mut spill_over = Array2::zeros((n, t.saturating_sub(1)));
    for step in 0..t.saturating_sub(1) {
        let (before, after) = graphs.split_at_mut(step + 1);
        let (earlier, later) = (&before[step], &mut after[0]);
        let mut reaches_earlier = vec![false; n];
        for i in 0..n {
            if later.member[i] && earlier.member[i] {
                let root = later.sets.find(i);
                reaches_earlier[root] = true;
            }
        }
        for j in 0..n {
            if later.member[j] && !earlier.member[j] && reaches_earlier[later.sets.find(j)] {
                spill_over[[j, step]] = 1;
            }
        }
    }
    debug!(
        spillovers = spill_over.iter().filter(|&&s| s == 1).count(),
        "spillover detection complete"
    );

    Ok(Spillover {
        components,
        spill_over,
    })
}
