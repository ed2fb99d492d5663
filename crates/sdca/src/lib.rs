//! sdca: proximal and projection operators for stochastic dual coordinate
//! ascent training of multiclass and multilabel classifiers with top-k
//! losses.
//!
//! This is the umbrella crate: it re-exports [`sdca_prox`] and
//! [`sdca_error`], and hosts the abstractly-specified [`driver`] interface
//! an external training loop consumes. It contains no training loop, no
//! dataset abstraction, and no BLAS calls — see the [`driver`] module doc
//! for exactly where that boundary sits.
//!
//! # Installation
//!
//! In your Rust project's root directory, simply run:
//!
//! ```bash
//! cargo add sdca
//! ```
//!
//! # Example
//!
//! ```
//! use sdca::prelude::*;
//!
//! let mut x = vec![3.0_f64, 1.0, -1.0, 5.0];
//! let mut aux = vec![0.0_f64; 4];
//! prox_knapsack_eq(&mut x, &mut aux, 0.0, 1.0, 1.0).unwrap();
//! assert!((x.iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// GLOBAL SETTINGS
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

// Strictly enforce documentation.
#![forbid(missing_docs)]
//
// When writing mathematical equations in documentation, Clippy suggests to
// put backticks inside the LaTeX block. This suppresses that behavior.
#![allow(clippy::doc_markdown)]

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// MODULES
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

pub mod driver;

/// The `sdca` prelude: the operators, threshold types, and error types
/// most callers need.
pub mod prelude {
    pub use crate::driver::{DualUpdate, ExampleUpdate, UpdateOutcome};
    pub use sdca_error::{ProxError, ProxResult};
    pub use sdca_prox::*;
}

/// The `error` module.
pub mod error {
    pub use sdca_error::*;
}

/// The `prox` module.
pub mod prox {
    pub use sdca_prox::*;
}
