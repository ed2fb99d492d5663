// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Operators over a pair of blocks `(x, y)` coupled by a shared budget,
//! used by losses (e.g. the bipartite ranking / multi-label hinge losses)
//! whose dual variables split into two simplices linked by `<1, x> = <1, y>`.
//!
//! [`thresholds_two_simplex`] and [`thresholds_two_simplex_sort`] solve the
//! same problem by two different algorithms (variable fixing vs. a single
//! sorted sweep adapted from Shalev-Shwartz's bipartite ranking solver) and
//! are kept side by side so callers can pick whichever fits their size
//! regime; [`thresholds_two_entropy`] is the entropy-regularized analogue,
//! solved by a single coupled Householder iteration instead of a
//! closed-form or combinatorial search.

use crate::knapsack::{partition, sort_desc};
use crate::primitives::sum_lambert_w_exp_d3;
use crate::thresholds::{GeneralizedThresholds, MapKind, Thresholds};
use num_traits::Float;

fn sum_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::zero(), |acc, &x| acc + x)
}

fn max_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::neg_infinity(), |acc, &x| R::max(acc, x))
}

/// Solves
/// `min_{x,y} ||x - a||^2 + ||y - b||^2` subject to
/// `<1, x> = <1, y> <= rhs`, `x, y >= 0`, via the variable-fixing method:
/// first look for a solution with the budget met exactly by both blocks
/// (phase 1); if that is infeasible (would need a negative shared
/// threshold sum), re-solve with the budget relaxed to the largest common
/// value both blocks can still meet (phase 2).
///
/// `rhs` must be strictly positive; `a` and `b` must be non-empty.
pub fn thresholds_two_simplex<R: Float>(
    a: &mut [R],
    b: &mut [R],
    rhs: R,
) -> (Thresholds<R>, Thresholds<R>) {
    let lo = R::zero();
    let hi = rhs;
    let eps = R::epsilon() * R::max(R::one(), rhs);

    let mut x_last = a.len();
    let mut t;
    loop {
        t = (sum_of(&a[..x_last]) - rhs) / R::from(x_last).unwrap();
        let x_it = partition(&mut a[..x_last], |&x| x > t);
        if x_it == x_last {
            break;
        }
        x_last = x_it;
    }

    let mut y_last = b.len();
    let mut s;
    loop {
        s = (sum_of(&b[..y_last]) - rhs) / R::from(y_last).unwrap();
        let y_it = partition(&mut b[..y_last], |&y| y > s);
        if y_it == y_last {
            break;
        }
        y_last = y_it;
    }

    if t + s >= -eps {
        return (
            Thresholds::with_range(t, lo, hi, 0, x_last),
            Thresholds::with_range(s, lo, hi, 0, y_last),
        );
    }

    // Phase 2: relax the shared budget to r < rhs, enforcing <1,x> = <1,y>
    // via a single coupled threshold t (with the y-side threshold -t).
    let mut m = x_last + y_last;
    t = (sum_of(&a[..x_last]) - sum_of(&b[..y_last])) / R::from(m).unwrap();
    loop {
        let x_it = partition(&mut a[..x_last], |&x| x > t);
        let sum_x = sum_of(&a[x_it..x_last]);
        let n_x = x_last - x_it;

        let y_it = partition(&mut b[..y_last], |&y| y > -t);
        let sum_y = sum_of(&b[y_it..y_last]);
        let n_y = y_last - y_it;

        let infeas = sum_x - sum_y - R::from(n_x + n_y).unwrap() * t;
        let tt;
        if n_y > 0 && infeas > eps {
            y_last = y_it;
            tt = R::from(m).unwrap() * t + sum_y;
            m -= n_y;
        } else if n_x > 0 && infeas < -eps {
            x_last = x_it;
            tt = R::from(m).unwrap() * t - sum_x;
            m -= n_x;
        } else {
            x_last = x_it;
            y_last = y_it;
            break;
        }

        if m > 0 {
            t = tt / R::from(m).unwrap();
        } else {
            break;
        }
    }

    (
        Thresholds::with_range(t, lo, hi, 0, x_last),
        Thresholds::with_range(-t, lo, hi, 0, y_last),
    )
}

/// Solves the same problem as [`thresholds_two_simplex`] by a single
/// sorted sweep over both blocks, adapted from Shai Shalev-Shwartz's
/// bipartite ranking solver (`bipartite_solver.cc` in his Sopopo
/// implementation). Sorts `a` and `b` in place (descending) as part of the
/// search.
pub fn thresholds_two_simplex_sort<R: Float>(
    a: &mut [R],
    b: &mut [R],
    rhs: R,
) -> (Thresholds<R>, Thresholds<R>) {
    let lo = R::zero();
    let hi = rhs;
    let eps = R::epsilon() * R::max(R::one(), rhs);

    sort_desc(a);
    sort_desc(b);

    let cap = rhs;
    let mut c = R::zero();
    let mut best_c = rhs;
    let mut sum_mu = a[0];
    let mut sum_nu = b[0];

    let mut r = 1usize;
    let mut s = 1usize;
    let mut a_r = if r < a.len() { a[r] } else { a[a.len() - 1] - cap };
    let mut b_s = if s < b.len() { b[s] } else { b[b.len() - 1] - cap };

    while c < cap {
        let copt =
            (R::from(s).unwrap() * sum_mu + R::from(r).unwrap() * sum_nu) / R::from(r + s).unwrap();
        let next_cr = (sum_mu + a_r) - R::from(r + 1).unwrap() * a_r;
        let next_cs = (sum_nu + b_s) - R::from(s + 1).unwrap() * b_s;
        let next_c = R::min(R::min(next_cr, next_cs), cap);

        if c <= copt && copt < next_c {
            best_c = copt;
            break;
        }
        if next_c >= cap - eps {
            best_c = cap;
            break;
        }

        if next_cr < next_cs {
            sum_mu = sum_mu + a_r;
            r += 1;
            a_r = if r < a.len() { a[r] } else { a[a.len() - 1] - cap };
        } else {
            sum_nu = sum_nu + b_s;
            s += 1;
            b_s = if s < b.len() { b[s] } else { b[b.len() - 1] - cap };
        }
        c = next_c;
    }

    let theta_a = (sum_mu - best_c) / R::from(r).unwrap();
    let theta_b = (sum_nu - best_c) / R::from(s).unwrap();

    (
        Thresholds::with_range(theta_a, lo, hi, 0, r),
        Thresholds::with_range(theta_b, lo, hi, 0, s),
    )
}

/// One order-4 Householder step for the coupled equation
/// `sum_i W_0(exp(a_i - t)) + sum_i W_0(exp(b_i - t - c)) = alpha`.
fn two_sum_w_exp_iter_4<R: Float>(a: &[R], b: &[R], alpha: R, c: R, t: R) -> R {
    let (f0a, f1a, f2a, f3a) = sum_lambert_w_exp_d3(a, -t);
    let (f0b, f1b, f2b, f3b) = sum_lambert_w_exp_d3(b, -t - c);
    let mut f0 = f0a + f0b;
    let f1 = f1a + f1b;
    let f2 = f2a + f2b;
    let f3 = f3a + f3b;
    f0 = f0 - alpha;

    let two = R::from(2.0).unwrap();
    let three = R::from(3.0).unwrap();
    let six = R::from(6.0).unwrap();
    let f02 = f0 * f2;
    let f11 = f1 * f1;
    let d = six * f1 * (f02 - f11) - f0 * (f0 * f3);
    let eps = R::from(64.0).unwrap() * R::min_positive_value();
    if d.abs() > eps {
        t - three * f0 * (two * f11 - f02) / d
    } else {
        t
    }
}

/// Solves
/// `min_{x,y} 0.5 alpha ||x - a/alpha - 1/p||^2 + <x, log(x)> + 0.5 alpha
/// ||y - b/alpha||^2 + <y, log(y)>` subject to `<1, x> = <1, y> = 1`,
/// `x, y >= 0`, where `p = dim(a)`.
///
/// The solution is `x = W_0(exp(a - t)) / alpha`, `y = W_0(exp(b - t - c))
/// / alpha` with `c = alpha / p`. `a` and `b` must be non-empty.
pub fn thresholds_two_entropy<R: Float>(
    a: &[R],
    b: &[R],
    alpha: R,
) -> (GeneralizedThresholds<R>, GeneralizedThresholds<R>) {
    const MAX_ITER: usize = 32;
    let eps = R::epsilon();
    let c = alpha / R::from(a.len()).unwrap();
    let mut t = R::max(max_of(a), max_of(b) - c);

    for _ in 0..MAX_ITER {
        let t1 = t;
        t = two_sum_w_exp_iter_4(a, b, alpha, c, t);
        if (t1 - t).abs() <= eps {
            break;
        }
    }

    let lo = R::zero();
    let hi = R::one();
    let map = MapKind::LambertWScaled(R::one() / alpha);
    (
        GeneralizedThresholds::new(Thresholds::with_range(t, lo, hi, 0, a.len()), map),
        GeneralizedThresholds::new(Thresholds::with_range(t + c, lo, hi, 0, b.len()), map),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupled_feasible(xs: &[f64], ys: &[f64], rhs: f64, eps: f64) {
        for &x in xs {
            assert!(x >= -eps);
        }
        for &y in ys {
            assert!(y >= -eps);
        }
        let sx: f64 = xs.iter().sum();
        let sy: f64 = ys.iter().sum();
        assert!((sx - sy).abs() < eps, "{} vs {}", sx, sy);
        assert!(sx <= rhs + eps);
    }

    #[test]
    fn two_simplex_phase1_feasible_when_budgets_match() {
        let mut a = vec![3.0_f64, 1.0, 0.2];
        let mut b = vec![2.0_f64, 2.0, 2.0];
        let (t, s) = thresholds_two_simplex(&mut a, &mut b, 1.0);
        let mut xs = a.clone();
        let mut ys = b.clone();
        t.apply(&mut xs);
        s.apply(&mut ys);
        coupled_feasible(&xs, &ys, 1.0, 1e-8);
    }

    #[test]
    fn two_simplex_phase2_when_one_side_is_small() {
        let mut a = vec![0.01_f64, 0.02];
        let mut b = vec![5.0_f64, 4.0, 3.0];
        let (t, s) = thresholds_two_simplex(&mut a, &mut b, 1.0);
        let mut xs = a.clone();
        let mut ys = b.clone();
        t.apply(&mut xs);
        s.apply(&mut ys);
        coupled_feasible(&xs, &ys, 1.0, 1e-6);
    }

    #[test]
    fn two_simplex_sort_matches_variable_fixing() {
        let mut a1 = vec![3.0_f64, 1.0, 0.2, 4.0];
        let mut b1 = vec![2.0_f64, 2.0, 2.0];
        let mut a2 = a1.clone();
        let mut b2 = b1.clone();

        let (t1, s1) = thresholds_two_simplex(&mut a1, &mut b1, 1.0);
        let (t2, s2) = thresholds_two_simplex_sort(&mut a2, &mut b2, 1.0);

        assert!((t1.t - t2.t).abs() < 1e-9);
        assert!((s1.t - s2.t).abs() < 1e-9);
    }

    #[test]
    fn two_entropy_couples_the_two_blocks() {
        let a = vec![1.0_f64, 0.5, -0.2];
        let b = vec![0.8_f64, 0.1];
        let (gt_a, gt_b) = thresholds_two_entropy(&a, &b, 1.0);

        let mut xs = a.clone();
        let mut ys = b.clone();
        gt_a.apply(&mut xs);
        gt_b.apply(&mut ys);

        let sx: f64 = xs.iter().sum();
        let sy: f64 = ys.iter().sum();
        assert!((sx - 1.0).abs() < 1e-6);
        assert!((sy - 1.0).abs() < 1e-6);
    }
}
