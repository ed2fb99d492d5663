//! Error types shared by the `sdca` proximal-operator workspace.
//!
//! A proximal operator can fail in exactly one way that matters to a
//! caller before any floating-point work happens: the parameters
//! describing the constraint set are out of their domain (a non-positive
//! budget, a `k` outside `1..=dim`, an empty or mismatched index range).
//! Those are modeled here as a typed, eagerly-checked [`ProxError`].
//!
//! Failure to *converge* numerically is a different kind of event — it is
//! not a violation of the caller's contract, just a signal that an
//! iterative inner solve ran out of iterations. That is represented as a
//! flag on the result value itself (see `sdca_prox::Thresholds`), not as
//! an `Err` here.

#![forbid(missing_docs)]

use thiserror::Error;

/// Parameter-domain errors raised by the proximal operators before any
/// numerical work is attempted.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ProxError {
    /// The input range (or one of a paired pair of ranges) is empty.
    #[error("input range must be non-empty")]
    EmptyRange,

    /// A budget/radius parameter (e.g. the simplex or knapsack right-hand
    /// side) must be strictly positive.
    #[error("rhs must be strictly positive, got {rhs}")]
    NonPositiveRhs {
        /// The offending value.
        rhs: f64,
    },

    /// A scale parameter (e.g. the entropy temperature) must be strictly
    /// positive.
    #[error("alpha must be strictly positive, got {alpha}")]
    NonPositiveAlpha {
        /// The offending value.
        alpha: f64,
    },

    /// `k` must satisfy `1 <= k <= dim`.
    #[error("k must satisfy 1 <= k <= dim, got k = {k}, dim = {dim}")]
    InvalidTopK {
        /// The requested top-k cutoff.
        k: usize,
        /// The dimensionality of the range `k` was checked against.
        dim: usize,
    },

    /// The two ranges of a paired (two-block) operator must have equal,
    /// positive length.
    #[error("paired ranges must have equal, positive length, got {a_len} and {b_len}")]
    MismatchedRangeLength {
        /// Length of the first range.
        a_len: usize,
        /// Length of the second range.
        b_len: usize,
    },
}

/// Convenience alias for results produced by the parameter-validating
/// entry points of `sdca_prox`.
pub type ProxResult<T> = Result<T, ProxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            ProxError::NonPositiveRhs { rhs: -1.0 }.to_string(),
            "rhs must be strictly positive, got -1"
        );
        assert_eq!(
            ProxError::InvalidTopK { k: 0, dim: 5 }.to_string(),
            "k must satisfy 1 <= k <= dim, got k = 0, dim = 5"
        );
        assert_eq!(
            ProxError::EmptyRange.to_string(),
            "input range must be non-empty"
        );
    }
}
