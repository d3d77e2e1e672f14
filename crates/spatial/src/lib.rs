//! Spatially conditioned Markov chains.
//!
//! A continuous or categorical `n x t` panel is discretized, each unit's
//! spatial lag is classified, and transitions are counted separately for
//! every lag class. The resulting conditional chains are compared with the
//! pooled chain by homogeneity tests and an optional permutation test.
//!
//! Neighbor structures implement [`SpatialWeights`]; [`NeighborList`] is a
//! row-standardized adjacency list.

pub mod config;
pub mod discretize;
pub mod error;
pub mod spatial_markov;
pub mod weights;

pub use config::{QuantileScope, SpatialMarkovConfig};
pub use discretize::{Discretized, discretize};
pub use error::SpatialError;
pub use spatial_markov::{SpatialMarkov, X2Permutation};
pub use weights::{NeighborList, SpatialWeights};
