//! Discrete-time Markov chains estimated from panel data.
//!
//! States are arbitrary ordered labels, observed for `n` units over `t`
//! periods. Transitions are pooled over all consecutive period pairs and
//! row-normalized into a transition matrix, which is then decomposed into
//! communicating classes and analysed.
//!
//! # Pipeline
//!
//! ```text
//!  ┌──────────────┐     ┌──────────────┐     ┌──────────────────────┐
//!  │  transition   │────▶│   classes    │────▶│ steady_state         │
//!  │  (count, P)   │     │  (decompose) │     │ passage / sojourn    │
//!  └──────────────┘     └──────────────┘     └──────────────────────┘
//! ```
//!
//! Results whose shape depends on the decomposition are explicit:
//! [`SteadyState::Ergodic`] carries one distribution and
//! [`SteadyState::Decomposed`] one per recurrent class.
//!
//! # Quick start
//!
//! ```rust
//! use geodyn_markov::{Markov, MarkovConfig};
//! use ndarray::array;
//!
//! let ids = array![[0, 1, 1, 2], [1, 1, 2, 0], [2, 0, 1, 1]];
//! let chain = Markov::new(ids.view(), MarkovConfig::new().with_summary(false)).unwrap();
//!
//! assert_eq!(chain.k(), 3);
//! let mfpt = chain.mfpt().unwrap();
//! assert_eq!(mfpt.dim(), (3, 3));
//! ```

pub mod chain;
pub mod classes;
pub mod config;
pub mod error;
pub mod homogeneity;
mod linalg;
pub mod passage;
pub mod sojourn;
pub mod state;
pub mod steady_state;
pub mod transition;

pub use chain::{Markov, descending_ranks, full_rank_markov, geo_rank_markov};
pub use classes::{ClassKind, Classification, CommunicatingClass, classify_chain};
pub use config::MarkovConfig;
pub use error::MarkovError;
pub use homogeneity::{
    ChiSquareTest, HomogeneityResults, KullbackTest, chi2, homogeneity, kullback,
    permutation_p_value,
};
pub use passage::{DEFAULT_PASSAGE_CEILING, fundamental_matrix, mfpt, mfpt_with, var_mfpt_ergodic};
pub use sojourn::{SojournTimes, sojourn_time};
pub use state::StateSpace;
pub use steady_state::{SteadyState, steady_state, steady_state_with};
pub use transition::{
    ROW_SUM_TOLERANCE, TransitionMatrix, count_transitions, estimate_transitions, prais,
};
