// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! The continuous quadratic knapsack family: projection onto a box
//! intersected with an equality or inequality budget constraint.
//!
//! `thresholds_knapsack_eq` implements Algorithm 3.1 of Kiwiel, K. C.,
//! "Variable fixing algorithms for the continuous quadratic knapsack
//! problem", Journal of Optimization Theory and Applications 136.3 (2008):
//! 445-458 — every other operator in this crate that needs an equality
//! budget constraint (the top-k simplex family, the two-block operators'
//! feasibility checks) is built on top of it.

use crate::thresholds::Thresholds;
use num_traits::Float;

/// Solves
/// `min_x 0.5 <x, x> - <a, x>` subject to `<1, x> = rhs`, `lo <= x_i <= hi`.
///
/// The solution is `x = clamp(a - t, lo, hi)`. `a` is partitioned and
/// partially reordered in place by the search; callers that need the
/// original order preserved should pass a scratch copy (see the `prox_*`
/// wrappers in [`crate::apply`]).
pub fn thresholds_knapsack_eq<R: Float>(a: &mut [R], lo: R, hi: R, rhs: R) -> Thresholds<R> {
    let n = a.len();
    let eps = R::epsilon() * R::max(R::one(), rhs.abs());

    let mut t = (sum(a) - rhs) / R::from(n).unwrap();

    let (mut m_first, mut m_last) = (0usize, n);
    loop {
        let tt_lo = lo + t;
        let lo_it = partition(&mut a[m_first..m_last], |&x| x > tt_lo) + m_first;
        let infeas_lo = R::max(
            R::zero(),
            tt_lo * R::from(m_last - lo_it).unwrap() - sum(&a[lo_it..m_last]),
        );

        let tt_hi = hi + t;
        let hi_it = partition(&mut a[m_first..lo_it], |&x| x > tt_hi) + m_first;
        let infeas_hi = R::max(
            R::zero(),
            sum(&a[m_first..hi_it]) - tt_hi * R::from(hi_it - m_first).unwrap(),
        );

        let delta;
        if (infeas_hi - infeas_lo).abs() <= eps {
            m_first = hi_it;
            m_last = lo_it;
            break;
        } else if infeas_lo < infeas_hi {
            m_first = hi_it;
            delta = -infeas_hi;
        } else {
            m_last = lo_it;
            delta = infeas_lo;
        }
        if m_first == m_last {
            break;
        }
        t = t + delta / R::from(m_last - m_first).unwrap();
    }

    // Recompute t for numerical accuracy (Lemma 5.3 of Kiwiel 2008).
    if m_first != m_last {
        let mut t_lo = R::min_value();
        let mut t_hi = R::max_value();
        if m_last != n {
            t_lo = max_of(&a[m_last..n]) - lo;
        }
        if m_first != 0 {
            t_hi = min_of(&a[0..m_first]) - hi;
        }
        t = (sum(&a[m_first..m_last]) - rhs
            + hi * R::from(m_first).unwrap()
            + lo * R::from(n - m_last).unwrap())
            / R::from(m_last - m_first).unwrap();
        t = R::max(t_lo, R::min(t, t_hi));
    } else if m_last != n {
        t = max_of(&a[m_last..n]) - lo;
    } else {
        t = min_of(&a[0..m_first]) - hi;
    }

    Thresholds::with_range(t, lo, hi, m_first, m_last)
}

/// Solves
/// `min_x 0.5 <x, x> - <a, x>` subject to `<1, x> <= rhs`, `lo <= x_i <= hi`.
///
/// If the unconstrained clamp to `[lo, hi]` already satisfies the budget,
/// the inequality is inactive and `t = 0`; otherwise this defers to
/// [`thresholds_knapsack_eq`] with the budget met exactly.
pub fn thresholds_knapsack_le<R: Float>(a: &mut [R], lo: R, hi: R, rhs: R) -> Thresholds<R> {
    let n = a.len();
    let eps = R::epsilon() * R::max(R::one(), rhs.abs());

    let m_first = partition(a, |&x| x >= hi);
    let m_last = partition(&mut a[m_first..], |&x| x > lo) + m_first;
    let s = sum(&a[m_first..m_last])
        + hi * R::from(m_first).unwrap()
        + lo * R::from(n - m_last).unwrap();

    if s > rhs + eps {
        thresholds_knapsack_eq(a, lo, hi, rhs)
    } else {
        Thresholds::with_range(R::zero(), lo, hi, m_first, m_last)
    }
}

fn thresholds_knapsack_le_biased_search<R: Float>(
    a: &mut [R],
    lo: R,
    hi: R,
    rhs: R,
    rho: R,
) -> Thresholds<R> {
    let n = a.len();
    let eps = R::epsilon() * R::max(R::one(), rhs.abs());
    sort_desc(a);

    let rho_rhs = rho * rhs;
    let rho_inverse = R::one() / rho;
    let num_x = R::from(n).unwrap();

    let mut num_u = R::zero();
    let mut min_u = R::infinity();
    let mut m_first = 0usize;
    loop {
        let num_l0 = num_x - num_u;
        let mut num_m = R::zero();
        let mut sum_m = R::zero();
        let mut min_m = R::infinity();
        let mut max_m = R::neg_infinity();
        let mut num_l = num_l0;

        let mut m_last = m_first;
        loop {
            let t = (lo * num_l + hi * num_u + sum_m) / (rho_inverse + num_m);
            if t <= rho_rhs + eps {
                let tt_hi = hi + t;
                if max_m - eps <= tt_hi && tt_hi <= min_u + eps {
                    let tt_lo = lo + t;
                    let last_ok = m_last == n || a[m_last] - eps <= tt_lo;
                    if tt_lo <= min_m + eps && last_ok {
                        return Thresholds::with_range(t, lo, hi, m_first, m_last);
                    }
                }
            }

            if m_last == n {
                break;
            }
            min_m = a[m_last];
            max_m = a[m_first];
            sum_m = sum_m + min_m;
            num_l = num_l - R::one();
            num_m = num_m + R::one();
            m_last += 1;
        }

        if m_first == n {
            break;
        }
        min_u = a[m_first];
        num_u = num_u + R::one();
        m_first += 1;
    }

    Thresholds::with_range(R::zero(), R::zero(), R::zero(), 0, 0)
}

/// Solves
/// `min_x 0.5 (<x, x> + rho <1, x>^2) - <a, x>` subject to `<1, x> <= rhs`,
/// `lo <= x_i <= hi`.
///
/// `rho` biases the budget with a quadratic penalty (as in the SDCA dual
/// objective for the bias/intercept term); `rho = 0` falls back to
/// [`thresholds_knapsack_le`].
pub fn thresholds_knapsack_le_biased<R: Float>(
    a: &mut [R],
    lo: R,
    hi: R,
    rhs: R,
    rho: R,
) -> Thresholds<R> {
    if rho == R::zero() {
        return thresholds_knapsack_le(a, lo, hi, rhs);
    }

    let eps = R::epsilon() * R::max(R::one(), rhs.abs());
    let t = thresholds_knapsack_eq(a, lo, hi, rhs);
    if t.t >= rho * rhs - eps {
        return t;
    }

    thresholds_knapsack_le_biased_search(a, lo, hi, rhs, rho)
}

fn sum<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::zero(), |acc, &x| acc + x)
}

fn max_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::neg_infinity(), |acc, &x| R::max(acc, x))
}

fn min_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::infinity(), |acc, &x| R::min(acc, x))
}

/// Stable-ish Hoare-style partition à la `std::partition`: reorders `xs` in
/// place so that every element satisfying `pred` comes first, and returns
/// the index of the first element that does not.
pub(crate) fn partition<R: Copy>(xs: &mut [R], pred: impl Fn(&R) -> bool) -> usize {
    let mut i = 0;
    for j in 0..xs.len() {
        if pred(&xs[j]) {
            xs.swap(i, j);
            i += 1;
        }
    }
    i
}

pub(crate) fn sort_desc<R: Float>(xs: &mut [R]) {
    xs.sort_by(|a, b| b.partial_cmp(a).unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feasible<R: Float + std::fmt::Debug>(xs: &[R], lo: R, hi: R, rhs: R, eps: R) {
        for &x in xs {
            assert!(x >= lo - eps, "{:?} < lo", x);
            assert!(x <= hi + eps, "{:?} > hi", x);
        }
        let s = xs.iter().fold(R::zero(), |acc, &x| acc + x);
        assert!((s - rhs).abs() <= eps, "sum {:?} != rhs {:?}", s, rhs);
    }

    #[test]
    fn knapsack_eq_projects_onto_the_scaled_simplex() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let mut aux = a.clone();
        let t = thresholds_knapsack_eq(&mut aux, 0.0, 1.0, 1.0);
        t.apply(&mut a);
        feasible(&a, 0.0, 1.0, 1.0, 1e-10);
    }

    #[test]
    fn knapsack_eq_handles_a_wide_box() {
        let mut a = vec![10.0_f64, -10.0, 0.0, 2.0];
        let mut aux = a.clone();
        let t = thresholds_knapsack_eq(&mut aux, -5.0, 5.0, 3.0);
        t.apply(&mut a);
        feasible(&a, -5.0, 5.0, 3.0, 1e-10);
    }

    #[test]
    fn knapsack_le_is_inactive_when_budget_is_not_exceeded() {
        let mut a = vec![0.1_f64, 0.2, 0.05];
        let mut aux = a.clone();
        let t = thresholds_knapsack_le(&mut aux, 0.0, 1.0, 1.0);
        assert_eq!(t.t, 0.0);
        t.apply(&mut a);
        assert_eq!(a, vec![0.1, 0.2, 0.05]);
    }

    #[test]
    fn knapsack_le_activates_when_budget_is_exceeded() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let mut aux = a.clone();
        let t = thresholds_knapsack_le(&mut aux, 0.0, 1.0, 1.0);
        t.apply(&mut a);
        let s: f64 = a.iter().sum();
        assert!(s <= 1.0 + 1e-10);
        feasible(&a, 0.0, 1.0, s, 1e-9);
    }

    #[test]
    fn knapsack_le_biased_falls_back_to_unbiased_when_rho_is_zero() {
        let mut a1 = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let mut a2 = a1.clone();
        let mut aux1 = a1.clone();
        let mut aux2 = a1.clone();
        let t1 = thresholds_knapsack_le(&mut aux1, 0.0, 1.0, 1.0);
        let t2 = thresholds_knapsack_le_biased(&mut aux2, 0.0, 1.0, 1.0, 0.0);
        t1.apply(&mut a1);
        t2.apply(&mut a2);
        assert_eq!(a1, a2);
    }

    #[test]
    fn knapsack_le_biased_respects_the_box() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0, 2.5];
        let mut aux = a.clone();
        let t = thresholds_knapsack_le_biased(&mut aux, 0.0, 1.0, 1.0, 0.5);
        t.apply(&mut a);
        for &x in &a {
            assert!((0.0..=1.0).contains(&x));
        }
    }
}
