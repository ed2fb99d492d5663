// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Projection onto the top-k simplex: the top-k cone intersected with the
//! budget constraint `<1, x> <= rhs`. The feasible set of the dual
//! variables for the top-k hinge/logistic losses used in multi-label
//! classification.
//!
//! Both operators first try the cheap [`crate::knapsack::thresholds_knapsack_eq`]
//! solution (as if the top-k cone constraint were absent) and only fall
//! back to the full cone search when that solution would violate it.

use crate::knapsack::thresholds_knapsack_eq;
use crate::thresholds::Thresholds;
use crate::topk_cone::{
    thresholds_topk_cone_biased_search, thresholds_topk_cone_search, topk_cone_special_cases,
    Projection,
};
use num_traits::Float;

/// Whether the knapsack-only solution `x = clamp(a - t, 0, rhs/k)` with
/// active set `u[..first]` (values pinned at `rhs/k`) already satisfies the
/// top-k cone constraint `max_k(x) <= <1, x> / k`, given as the elements
/// *not* covered by `u` summing correctly. Mirrors the check the knapsack
/// solver's caller must make before accepting its result as-is.
pub fn is_topk_simplex_lt<R: Float>(u: &[R], t: R, k: R, rhs: R) -> bool {
    if u.is_empty() {
        t < R::zero()
    } else {
        let num_u = R::from(u.len()).unwrap();
        let sum_u = u.iter().fold(R::zero(), |acc, &x| acc + x);
        k * (sum_u + (k - num_u) * t) < rhs * num_u
    }
}

/// Solves
/// `min_x 0.5 <x, x> - <a, x>` subject to `<1, x> <= rhs`,
/// `0 <= x_i <= <1, x> / k`. The solution is `x = max(0, min(a - t, hi))`.
pub fn thresholds_topk_simplex<R: Float>(a: &mut [R], k: usize, rhs: R) -> Thresholds<R> {
    let kf = R::from(k).unwrap();
    let case = topk_cone_special_cases(a, k, kf);
    match case.projection {
        Projection::Zero => case.thresholds,
        Projection::Constant => {
            if kf * case.thresholds.hi > rhs {
                thresholds_knapsack_eq(a, R::zero(), rhs / kf, rhs)
            } else {
                case.thresholds
            }
        }
        Projection::General => {
            let t = thresholds_knapsack_eq(a, R::zero(), rhs / kf, rhs);
            if is_topk_simplex_lt(&a[..t.first], t.t, kf, rhs) {
                thresholds_topk_cone_search(a, k)
            } else {
                t
            }
        }
    }
}

/// Whether the biased knapsack-only solution already satisfies the biased
/// top-k cone constraint; see [`is_topk_simplex_lt`].
pub fn is_topk_simplex_biased_lt<R: Float>(u: &[R], t: R, k: R, rhs: R, rho: R, eps: R) -> bool {
    if u.is_empty() {
        t < rho * rhs - eps
    } else {
        let num_u = R::from(u.len()).unwrap();
        let sum_u = u.iter().fold(R::zero(), |acc, &x| acc + x);
        k * (sum_u + (k - num_u) * t) < rhs * (num_u + rho * k * k) - eps
    }
}

/// Solves
/// `min_x 0.5 (<x, x> + rho <1, x>^2) - <a, x>` subject to `<1, x> <= rhs`,
/// `0 <= x_i <= <1, x> / k`. The solution is `x = max(0, min(a - t, hi))`.
pub fn thresholds_topk_simplex_biased<R: Float>(
    a: &mut [R],
    k: usize,
    rhs: R,
    rho: R,
) -> Thresholds<R> {
    let kf = R::from(k).unwrap();
    let eps = R::epsilon() * R::max(R::one(), rhs.abs());
    let case = topk_cone_special_cases(a, k, kf + rho * kf * kf);
    match case.projection {
        Projection::Zero => case.thresholds,
        Projection::Constant => {
            if kf * case.thresholds.hi > rhs + eps {
                thresholds_knapsack_eq(a, R::zero(), rhs / kf, rhs)
            } else {
                case.thresholds
            }
        }
        Projection::General => {
            let t = thresholds_knapsack_eq(a, R::zero(), rhs / kf, rhs);
            if is_topk_simplex_biased_lt(&a[..t.first], t.t, kf, rhs, rho, eps) {
                thresholds_topk_cone_biased_search(a, k, rho)
            } else {
                t
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feasible(xs: &[f64], k: usize, rhs: f64, eps: f64) {
        for &x in xs {
            assert!(x >= -eps, "{} < 0", x);
        }
        let s: f64 = xs.iter().sum();
        assert!(s <= rhs + eps, "sum {} > rhs {}", s, rhs);
        let mut sorted = xs.to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let max_k: f64 = sorted[..k].iter().sum::<f64>() / k as f64;
        for &x in xs {
            assert!(x <= max_k + eps, "{} > max_k {}", x, max_k);
        }
    }

    #[test]
    fn topk_simplex_is_feasible() {
        let mut a = vec![5.0_f64, 4.0, 3.0, 0.1, -2.0];
        let k = 2;
        let rhs = 1.0;
        let t = thresholds_topk_simplex(&mut a, k, rhs);
        let mut xs = a.clone();
        t.apply(&mut xs);
        feasible(&xs, k, rhs, 1e-8);
    }

    #[test]
    fn topk_simplex_biased_is_feasible() {
        let mut a = vec![5.0_f64, 4.0, 3.0, 0.1, -2.0, 1.0];
        let k = 2;
        let rhs = 1.0;
        let t = thresholds_topk_simplex_biased(&mut a, k, rhs, 0.3);
        let mut xs = a.clone();
        t.apply(&mut xs);
        feasible(&xs, k, rhs, 1e-8);
    }

    #[test]
    fn topk_simplex_all_negative_is_zero() {
        let mut a = vec![-1.0_f64, -2.0, -3.0];
        let t = thresholds_topk_simplex(&mut a, 2, 1.0);
        let mut xs = a.clone();
        t.apply(&mut xs);
        assert!(xs.iter().all(|&x| x == 0.0));
    }
}
