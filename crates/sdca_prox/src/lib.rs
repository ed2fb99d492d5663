//! sdca_prox: proximal and projection operators for box, simplex, top-k
//! cone, and entropy constraint sets.
//!
//! These are the per-example inner solves of stochastic dual coordinate
//! ascent (SDCA) training for multiclass and multilabel classifiers with
//! top-k losses: given a gradient-shifted score vector `a`, each operator
//! returns the point in its feasible set closest to `a` in Euclidean (or,
//! for the entropy family, Bregman) distance.
//!
//! Every operator is exposed at two levels:
//!
//! - the `thresholds_*` functions in [`knapsack`], [`topk_cone`],
//!   [`topk_simplex`], [`entropy`], and [`two_block`] take a mutable
//!   scratch slice (which they may sort or partition arbitrarily) and
//!   return a compact description of the solution — a shift/threshold plus
//!   the index range it applies to — rather than the projected vector
//!   itself;
//! - the `prox_*` functions in [`apply`] validate their parameters, copy
//!   the caller's input into scratch space, call the matching
//!   `thresholds_*` function, and apply the result back onto the
//!   caller's (unreordered) buffer.
//!
//! Most callers want [`apply`]. The lower-level modules are public because
//! a driver computing many projections per epoch benefits from reusing a
//! threshold's `dot_prox_prox`/`dot_x_prox` without rematerializing the
//! projected vector, and because the two granularities are this library's
//! natural unit of testing.

#![forbid(missing_docs)]
#![allow(clippy::doc_markdown)]

/// Internal macros shared across the proximal operator implementations.
#[macro_use]
pub mod macros;

pub mod apply;
pub mod entropy;
pub mod knapsack;
pub mod logexp;
pub mod primitives;
pub mod rootfinding;
pub mod thresholds;
pub mod topk_cone;
pub mod topk_simplex;
pub mod two_block;

pub use apply::{
    apply_rows, dot_prox_prox, dot_x_prox, prox_entropy, prox_entropy_norm, prox_knapsack_eq,
    prox_knapsack_le, prox_knapsack_le_biased, prox_topk_cone, prox_topk_cone_biased,
    prox_topk_entropy, prox_topk_entropy_biased, prox_topk_simplex, prox_topk_simplex_biased,
    prox_two_entropy, prox_two_simplex, prox_two_simplex_sort,
};
pub use thresholds::{GeneralizedThresholds, MapKind, Thresholds};
