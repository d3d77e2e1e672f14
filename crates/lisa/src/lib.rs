//! LISA transition analytics.
//!
//! Units are placed in one of the four Moran scatterplot quadrants every
//! period. [`LisaMarkov`] estimates the chain over quadrants, codes every
//! transition by its move type, tests whether own and neighbor dynamics
//! are independent, and detects spillover into existing clusters.
//! [`Rose`] summarises the direction of joint value/lag movement.
//!
//! ```
//! use geodyn_lisa::{LisaConfig, LisaMarkov, Quadrant, move_type};
//! use ndarray::array;
//!
//! let codes = array![[1u8, 1, 2], [3, 3, 3], [4, 1, 1]];
//! let lm = LisaMarkov::from_codes(codes.view(), None, LisaConfig::new()).unwrap();
//! assert_eq!(lm.move_types()[[1, 0]], move_type(Quadrant::LL, Quadrant::LL));
//! ```

pub mod config;
pub mod error;
pub mod lisa_markov;
pub mod quadrant;
pub mod rose;
pub mod spillover;

pub use config::{LisaConfig, RoseConfig};
pub use error::LisaError;
pub use lisa_markov::{IndependenceTest, LisaMarkov};
pub use quadrant::{Quadrant, move_type, quadrants, significant_move_type};
pub use rose::{Alternative, Rose, RosePermutation};
pub use spillover::{Spillover, detect_spillover};
