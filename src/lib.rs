//! Markov chain analytics for spatial panel data.
//!
//! This crate bundles the geodyn workspace:
//!
//! - [`stats`]: descriptive statistics, chi-square tails and the quantile
//!   discretizer.
//! - [`markov`]: transition estimation, class decomposition, steady states,
//!   passage and sojourn times, and homogeneity tests.
//! - [`spatial`]: spatial weights and Markov chains conditioned on the
//!   spatial lag.
//! - [`lisa`]: LISA quadrant chains, spillover detection and rose diagrams.
//!
//! ```
//! use geodyn::markov::{Markov, MarkovConfig, SteadyState};
//! use ndarray::array;
//!
//! let ids = array![[0, 0, 1, 1], [1, 0, 0, 1], [1, 1, 0, 0]];
//! let chain = Markov::new(ids.view(), MarkovConfig::new().with_summary(false)).unwrap();
//! match chain.steady_state().unwrap() {
//!     SteadyState::Ergodic(pi) => assert!((pi.sum() - 1.0).abs() < 1e-9),
//!     SteadyState::Decomposed(_) => unreachable!(),
//! }
//! ```

pub mod logging;

pub use geodyn_lisa as lisa;
pub use geodyn_markov as markov;
pub use geodyn_spatial as spatial;
pub use geodyn_stats as stats;
