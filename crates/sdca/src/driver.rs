//! Shapes of the interface a synchronous dual coordinate ascent driver
//! consumes from this crate: per-example dual variables and scores in,
//! updated dual variables and a threshold record out. No training loop, no
//! dataset abstraction, and no BLAS calls live here — those remain an
//! external collaborator's responsibility.
//!
//! A driver's inner loop, per example, per epoch:
//!
//! 1. Compute `scores` from the current primal weights and the example's
//!    features (a BLAS call the driver owns).
//! 2. Call [`ExampleUpdate::apply`] with the operator matching the
//!    example's loss, writing the new dual variables in place.
//! 3. Use the returned [`UpdateOutcome::thresholds`] to update the primal
//!    weights via a rank-1 outer-product update (again, the driver's own
//!    BLAS call) — `sdca_prox::dot_prox_prox`/`dot_x_prox` give the two
//!    dot products that update needs without materializing the projected
//!    dual vector twice.

use sdca_error::ProxResult;
use sdca_prox::{GeneralizedThresholds, Thresholds};

/// One example's slice of the dual variable matrix and the corresponding
/// gradient-shifted scores, both of length `m` (the number of classes).
pub struct ExampleUpdate<'a, R> {
    /// The example's dual variables, updated in place by [`Self::apply`].
    pub dual: &'a mut [R],
    /// Scratch space of length `m`, reused across calls by the driver to
    /// avoid a per-example allocation.
    pub aux: &'a mut [R],
}

/// Either flavor of threshold record a proximal operator can return,
/// carried through to the driver so it can still call
/// `sdca_prox::dot_prox_prox`/`dot_x_prox` (defined on [`Thresholds`]
/// only — the entropy family's nonlinear remap makes the equivalent
/// shortcut for [`GeneralizedThresholds`] a driver-side computation, not a
/// library one).
pub enum UpdateOutcome<R> {
    /// Produced by the knapsack, top-k cone, and top-k simplex families.
    Plain(Thresholds<R>),
    /// Produced by the entropy family.
    Generalized(GeneralizedThresholds<R>),
}

impl<R> UpdateOutcome<R> {
    /// Whether the solve that produced this outcome converged within its
    /// iteration budget. Always `true` for closed-form operators.
    pub fn converged(&self) -> bool {
        match self {
            UpdateOutcome::Plain(t) => t.converged,
            UpdateOutcome::Generalized(g) => g.base.converged,
        }
    }
}

/// A single per-example proximal update, abstracted over which operator
/// (knapsack, top-k cone/simplex, entropy, two-block) the example's loss
/// requires. Implementations live wherever the driver chooses to put them
/// — this crate defines only the call shape.
pub trait DualUpdate<R> {
    /// Projects `update.dual` (interpreted as `scores - dual`, or whatever
    /// shift convention the loss requires) onto the operator's feasible
    /// set, writing the result into `update.dual` and returning the
    /// threshold record.
    ///
    /// Implementations should `log::warn!` when
    /// `outcome.converged()` is `false` rather than silently accepting a
    /// best-effort iterate, per the driver-facing warn/ignore policy this
    /// crate's operators leave to their caller.
    fn apply(&self, update: ExampleUpdate<'_, R>) -> ProxResult<UpdateOutcome<R>>;
}

/// Logs a warning through the `log` crate when `outcome` represents a
/// non-converged solve, and returns it unchanged. A thin helper so
/// [`DualUpdate`] implementations share one place that decides what a
/// non-convergence warning looks like.
pub fn warn_on_non_convergence<R>(label: &str, outcome: UpdateOutcome<R>) -> UpdateOutcome<R> {
    if !outcome.converged() {
        log::warn!("{label}: proximal solve did not converge within its iteration budget");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdca_prox::{assert_approx_eq, prox_knapsack_eq, Thresholds};

    struct KnapsackEq {
        lo: f64,
        hi: f64,
        rhs: f64,
    }

    impl DualUpdate<f64> for KnapsackEq {
        fn apply(&self, update: ExampleUpdate<'_, f64>) -> ProxResult<UpdateOutcome<f64>> {
            prox_knapsack_eq(update.dual, update.aux, self.lo, self.hi, self.rhs)?;
            Ok(UpdateOutcome::Plain(Thresholds::new(0.0, self.lo, self.hi)))
        }
    }

    #[test]
    fn dual_update_trait_object_round_trips_through_the_operator() {
        let op = KnapsackEq {
            lo: 0.0,
            hi: 1.0,
            rhs: 1.0,
        };
        let mut dual = vec![3.0, 1.0, -1.0, 5.0];
        let mut aux = vec![0.0; 4];
        let outcome = op
            .apply(ExampleUpdate {
                dual: &mut dual,
                aux: &mut aux,
            })
            .unwrap();
        assert!(outcome.converged());
        let s: f64 = dual.iter().sum();
        assert_approx_eq!(s, 1.0, 1e-9);
    }

    #[test]
    fn warn_on_non_convergence_passes_the_outcome_through() {
        let t = Thresholds::new(0.0_f64, 0.0, 1.0).not_converged();
        let outcome = warn_on_non_convergence("test", UpdateOutcome::Plain(t));
        assert!(!outcome.converged());
    }
}
