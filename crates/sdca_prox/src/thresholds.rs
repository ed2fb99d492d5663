// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! The common result shape every `thresholds_*` solver in this crate
//! returns: a shift `t`, a box `[lo, hi]`, and (for the entropy family) a
//! nonlinear remapping applied after the shift and before the clamp.
//!
//! Applying a [`Thresholds`] to a slice is always the same uniform,
//! position-independent transform `x -> clamp(x - t, lo, hi)` (or, for
//! [`GeneralizedThresholds`], `x -> clamp(map(x - t), lo, hi)`); the
//! `first`/`last` index range most solvers also record is not needed to
//! apply the threshold, only to compute the two dot-product shortcuts
//! below without materializing the projected vector.

use crate::primitives::{clamp, lambert_w_exp};
use num_traits::Float;

/// A closed-form projection result: shift by `t`, clamp to `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds<R> {
    /// The amount to subtract from each coordinate before clamping.
    pub t: R,
    /// Lower clamp bound.
    pub lo: R,
    /// Upper clamp bound.
    pub hi: R,
    /// Start of the "active"/"middle" index range within the buffer the
    /// solver operated on (after any sorting/partitioning it performed).
    /// Positions before `first` were fixed at `hi`; see [`dot_prox_prox`].
    pub first: usize,
    /// End of the active range; positions at or after `last` were fixed at
    /// `lo`.
    pub last: usize,
    /// Whether the inner iterative solve (if any) converged within its
    /// iteration budget. Closed-form solvers always report `true`.
    pub converged: bool,
}

impl<R: Float> Thresholds<R> {
    /// A threshold with no meaningful partition, for closed-form solvers
    /// that never call [`dot_prox_prox`]/[`dot_x_prox`].
    pub fn new(t: R, lo: R, hi: R) -> Self {
        Thresholds {
            t,
            lo,
            hi,
            first: 0,
            last: 0,
            converged: true,
        }
    }

    /// A threshold carrying the active-range bookkeeping used by
    /// [`dot_prox_prox`]/[`dot_x_prox`].
    pub fn with_range(t: R, lo: R, hi: R, first: usize, last: usize) -> Self {
        Thresholds {
            t,
            lo,
            hi,
            first,
            last,
            converged: true,
        }
    }

    /// Marks this threshold as the result of a non-converged iterative
    /// solve; the value of `t` is still the best estimate found.
    pub fn not_converged(mut self) -> Self {
        self.converged = false;
        self
    }

    /// Applies `x -> clamp(x - t, lo, hi)` to every element of `xs`.
    pub fn apply(&self, xs: &mut [R]) {
        for x in xs.iter_mut() {
            *x = clamp(*x - self.t, self.lo, self.hi);
        }
    }
}

/// The nonlinear remapping applied by the entropy family of operators,
/// after the shift `x - t` and before the clamp to `[lo, hi]`.
///
/// A closed enum rather than a boxed closure: every entropy-family
/// operator uses exactly one of these four maps, fixed at the call site,
/// so there is no need to pay for dynamic dispatch or to support
/// user-supplied maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapKind<R> {
    /// `x`.
    Identity,
    /// `exp(x)`, used by [`crate::entropy::thresholds_entropy`] and
    /// [`crate::entropy::thresholds_topk_entropy`].
    Exp,
    /// `W_0(exp(x))`, used by
    /// [`crate::entropy::thresholds_entropy_norm`] and
    /// [`crate::two_block::thresholds_two_entropy`].
    LambertW,
    /// `a * W_0(exp(x))` for a fixed `a`, used by
    /// [`crate::entropy::thresholds_topk_entropy_biased`].
    LambertWScaled(R),
}

impl<R: Float> MapKind<R> {
    /// Applies the map to `x`.
    pub fn apply(&self, x: R) -> R {
        match self {
            MapKind::Identity => x,
            MapKind::Exp => x.exp(),
            MapKind::LambertW => lambert_w_exp(x),
            MapKind::LambertWScaled(a) => *a * lambert_w_exp(x),
        }
    }
}

/// A [`Thresholds`] paired with a [`MapKind`] applied between the shift and
/// the clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneralizedThresholds<R> {
    /// The shift, box, and active-range bookkeeping.
    pub base: Thresholds<R>,
    /// The remapping applied to `x - t` before clamping.
    pub map: MapKind<R>,
}

impl<R: Float> GeneralizedThresholds<R> {
    /// Builds a generalized threshold from its parts.
    pub fn new(base: Thresholds<R>, map: MapKind<R>) -> Self {
        GeneralizedThresholds { base, map }
    }

    /// Applies `x -> clamp(map(x - t), lo, hi)` to every element of `xs`.
    pub fn apply(&self, xs: &mut [R]) {
        let t = self.base.t;
        let lo = self.base.lo;
        let hi = self.base.hi;
        for x in xs.iter_mut() {
            *x = clamp(self.map.apply(*x - t), lo, hi);
        }
    }
}

/// Computes `<prox(x), prox(x)>` from a threshold and the buffer it was
/// computed over, without materializing `prox(x)`.
///
/// `xs` must be the same buffer (in the same order) that was passed to the
/// `thresholds_*` solver that produced `t` — typically the auxiliary copy
/// the solver was free to sort/partition, not the original input.
pub fn dot_prox_prox<R: Float>(t: &Thresholds<R>, xs: &[R]) -> R {
    let num_hi = R::from(t.first).unwrap();
    let num_mi = R::from(t.last - t.first).unwrap();
    let num_lo = R::from(xs.len() - t.last).unwrap();
    let mid = &xs[t.first..t.last];
    let sum_mi = mid.iter().fold(R::zero(), |acc, &x| acc + x);
    let dot_mi = mid.iter().fold(R::zero(), |acc, &x| acc + x * x);
    let two = R::from(2.0).unwrap();
    t.hi * t.hi * num_hi + t.t * t.t * num_mi + t.lo * t.lo * num_lo + dot_mi
        - two * t.t * sum_mi
}

/// Computes `<x, prox(x)>` from a threshold and the buffer it was computed
/// over, without materializing `prox(x)`. See [`dot_prox_prox`] for the
/// requirement on `xs`.
pub fn dot_x_prox<R: Float>(t: &Thresholds<R>, xs: &[R]) -> R {
    let sum_hi = xs[..t.first].iter().fold(R::zero(), |acc, &x| acc + x);
    let mid = &xs[t.first..t.last];
    let sum_mi = mid.iter().fold(R::zero(), |acc, &x| acc + x);
    let sum_lo = xs[t.last..].iter().fold(R::zero(), |acc, &x| acc + x);
    let dot_mi = mid.iter().fold(R::zero(), |acc, &x| acc + x * x);
    t.hi * sum_hi - t.t * sum_mi + t.lo * sum_lo + dot_mi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_clamps_into_the_box() {
        let t = Thresholds::new(1.0_f64, 0.0, 1.0);
        let mut xs = [3.0, 0.5, -2.0];
        t.apply(&mut xs);
        assert_eq!(xs, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn dot_products_match_materialized_computation() {
        let xs = [5.0_f64, 4.0, 0.3, -1.0, -5.0];
        let t = Thresholds::with_range(0.2_f64, 0.0, 1.0, 1, 4);
        let mut materialized = xs;
        t.apply(&mut materialized);

        let expected_pp: f64 = materialized.iter().map(|x| x * x).sum();
        let expected_xp: f64 = xs.iter().zip(materialized.iter()).map(|(a, b)| a * b).sum();

        assert!((dot_prox_prox(&t, &xs) - expected_pp).abs() < 1e-12);
        assert!((dot_x_prox(&t, &xs) - expected_xp).abs() < 1e-12);
    }

    #[test]
    fn generalized_apply_uses_the_map() {
        let gt = GeneralizedThresholds::new(Thresholds::new(0.0_f64, 0.0, 10.0), MapKind::Exp);
        let mut xs = [0.0_f64, 1.0];
        gt.apply(&mut xs);
        assert!((xs[0] - 1.0).abs() < 1e-12);
        assert!((xs[1] - std::f64::consts::E).abs() < 1e-12);
    }
}
