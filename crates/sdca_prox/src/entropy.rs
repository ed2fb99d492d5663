// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! The entropy family: projections whose KKT conditions involve `x log x`
//! instead of (or in addition to) a quadratic term, giving rise to an
//! `exp` or Lambert-`W` remapping rather than a plain clamp.
//!
//! `thresholds_entropy`/`thresholds_topk_entropy` have the same U/M
//! partition-and-search shape as the knapsack and top-k cone families;
//! `thresholds_entropy_norm`/`thresholds_topk_entropy_biased` additionally
//! need an inner root find (respectively a single Householder iteration on
//! `t` and a coupled Newton iteration on `(s, t)`) since the KKT system no
//! longer has a closed form.

use crate::knapsack::partition;
use crate::logexp::{log_sum_exp, log_sum_exp_dual, max_index};
use crate::primitives::{clamp, lambert_w_exp, lambert_w_exp_inverse, sum_lambert_w_exp_d1,
    sum_lambert_w_exp_d2, sum_lambert_w_exp_d3, x_log_x};
use crate::rootfinding::{halley_update, householder4_update, newton_update, MAX_ITER};
use crate::thresholds::{GeneralizedThresholds, MapKind, Thresholds};
use num_traits::Float;

fn exp_min_arg<R: Float>() -> R {
    R::min_positive_value().ln()
}

fn sum_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::zero(), |acc, &x| acc + x)
}

fn max_of<R: Float>(xs: &[R]) -> R {
    xs.iter().fold(R::neg_infinity(), |acc, &x| R::max(acc, x))
}

/// Solves
/// `min_x <x, log(x)> - <a, x>` subject to `<1, x> = rhs`, `0 <= x_i <= hi`.
///
/// The solution is `x = max(0, min(exp(a - t), hi))`.
pub fn thresholds_entropy<R: Float>(a: &mut [R], hi: R, rhs: R) -> GeneralizedThresholds<R> {
    let n = a.len();
    let eps = R::from(16.0).unwrap() * R::epsilon() * R::max(R::one(), rhs);
    let lo = R::zero();
    let mut r = rhs;
    let u = hi.ln() + eps;

    let mut t = log_sum_exp(a) - rhs.ln();
    let mut m_first = 0usize;
    loop {
        let tt = t + u;
        let it = partition(&mut a[m_first..], |&x| x > tt) + m_first;
        if it == m_first {
            break;
        }
        r = r - hi * R::from(it - m_first).unwrap();
        m_first = it;
        if it == n {
            break;
        }
        if r <= eps {
            t = max_of(&a[m_first..n]) - exp_min_arg::<R>() + R::one();
            break;
        }
        t = log_sum_exp(&a[m_first..n]) - r.ln();
    }

    GeneralizedThresholds::new(Thresholds::with_range(t, lo, hi, m_first, n), MapKind::Exp)
}

/// One Newton-Raphson (order 2) step for `sum_i W_0(exp(a_i - t)) = rhs`.
pub fn sum_w_exp_iter_2<R: Float>(a: &[R], rhs: R, t: R) -> R {
    let (mut f0, f1) = sum_lambert_w_exp_d1(a, -t);
    f0 = f0 - rhs;
    newton_update(t, f0, f1)
}

/// One Halley (order 3) step for `sum_i W_0(exp(a_i - t)) = rhs`.
pub fn sum_w_exp_iter_3<R: Float>(a: &[R], rhs: R, t: R) -> R {
    let (mut f0, f1, f2) = sum_lambert_w_exp_d2(a, -t);
    f0 = f0 - rhs;
    halley_update(t, f0, f1, f2)
}

/// One order-4 Householder step for `sum_i W_0(exp(a_i - t)) = rhs`.
pub fn sum_w_exp_iter_4<R: Float>(a: &[R], rhs: R, t: R) -> R {
    let (mut f0, f1, f2, f3) = sum_lambert_w_exp_d3(a, -t);
    f0 = f0 - rhs;
    householder4_update(t, f0, f1, f2, f3)
}

/// Drives [`sum_w_exp_iter_4`] from `t0` to a fixed point, clamping the
/// iterate below `max(a) - exp_min_arg()` to avoid an exp underflow that
/// would divide by zero. Returns the root and whether it converged within
/// `max_iter` steps.
pub fn solve_sum_w_exp_iterate<R: Float>(a: &[R], rhs: R, t0: R, max_iter: usize) -> (R, bool) {
    let ub = max_of(a) - exp_min_arg::<R>();
    let eps = R::from(16.0).unwrap() * R::epsilon();
    let mut t = t0;
    for _ in 0..max_iter {
        let t1 = t;
        t = sum_w_exp_iter_4(a, rhs, R::min(t, ub));
        if (t1 - t).abs() <= eps {
            return (t, true);
        }
    }
    (t, false)
}

/// Finds the root `t` of `sum_i W_0(exp(a_i - t)) = rhs`.
///
/// Seeds the Householder iteration with a cheap initial guess refined by
/// treating `W_0(exp(a_i - t)) ~= a_i - t` for the currently-largest
/// elements, the same heuristic [`crate::knapsack::thresholds_knapsack_eq`]
/// uses for its own initial guess.
pub fn solve_sum_w_exp<R: Float>(a: &mut [R], rhs: R) -> (R, bool) {
    let mut t = (sum_of(a) - rhs) / R::from(a.len()).unwrap();
    let mut u_last = a.len();
    loop {
        let it = partition(&mut a[..u_last], |&x| x > t);
        if it == u_last || it == 0 {
            break;
        }
        u_last = it;
        t = (sum_of(&a[..u_last]) - rhs) / R::from(u_last).unwrap();
    }
    solve_sum_w_exp_iterate(a, rhs, t, MAX_ITER)
}

/// Solves
/// `min_x 0.5 <x, x> + <x, log(x)> - <a, x>` subject to `<1, x> = rhs`,
/// `0 <= x_i <= hi`.
///
/// The solution is `x = max(0, min(W_0(exp(a - t)), hi))`.
pub fn thresholds_entropy_norm<R: Float>(a: &mut [R], hi: R, rhs: R) -> GeneralizedThresholds<R> {
    let n = a.len();
    let eps = R::from(16.0).unwrap() * R::epsilon() * R::max(R::one(), rhs);
    let lo = R::zero();
    let mut r = rhs;
    let u = hi + hi.ln() + eps;

    let (mut t, mut converged) = solve_sum_w_exp(a, rhs);
    let mut m_first = 0usize;
    loop {
        let tt = t + u;
        let it = partition(&mut a[m_first..], |&x| x > tt) + m_first;
        if it == m_first {
            break;
        }
        r = r - hi * R::from(it - m_first).unwrap();
        m_first = it;
        if it == n {
            break;
        }
        if r <= eps {
            t = max_of(&a[m_first..n]) - exp_min_arg::<R>() + R::one();
            break;
        }
        let (t2, c2) = solve_sum_w_exp(&mut a[m_first..n], r);
        t = t2;
        converged = converged && c2;
    }

    let mut th = Thresholds::with_range(t, lo, hi, m_first, n);
    if !converged {
        th = th.not_converged();
    }
    GeneralizedThresholds::new(th, MapKind::LambertW)
}

/// Solves
/// `min_{x,s} <x, log(x)> + (1 - s) log(1 - s) - <a, x>` subject to
/// `<1, x> = s`, `s <= 1`, `0 <= x_i <= s / k`.
///
/// The solution is `x = max(0, min(exp(a - t), hi))`.
pub fn thresholds_topk_entropy<R: Float>(a: &mut [R], k: usize) -> GeneralizedThresholds<R> {
    let n = a.len();
    let eps = R::from(16.0).unwrap() * R::epsilon();
    let kf = R::from(k).unwrap();

    let mut max_idx = max_index(a).unwrap();
    let (log_z0, lse1, _) = log_sum_exp_dual(a);
    let mut log_z = log_z0;

    let mut t = lse1;
    let lo = R::zero();
    let mut hi = R::one();
    if k <= 1 || a[max_idx] - eps <= log_z - kf.ln() {
        return GeneralizedThresholds::new(Thresholds::with_range(t, lo, hi, 0, n), MapKind::Exp);
    }

    let mut min_u = R::zero();
    let mut sum_u = R::zero();
    let mut k_u = kf;
    let mut z = R::zero();
    let mut m_first = 0usize;

    for _num_u in 1..k {
        min_u = a[max_idx];
        sum_u = sum_u + min_u;
        a.swap(m_first, max_idx);
        m_first += 1;
        k_u = k_u - R::one();
        max_idx = m_first + max_index(&a[m_first..n]).unwrap();

        let (lz, _, zz) = log_sum_exp_dual(&a[m_first..n]);
        log_z = lz;
        z = zz;

        let tt = log_z - k_u.ln();
        if a[max_idx] - eps <= tt && tt <= min_u + eps {
            break;
        }
    }

    let tmp = ((kf - k_u) * log_z + k_u * k_u.ln() - sum_u) / kf;
    let b = (tmp - a[max_idx]).exp() / kf;
    t = a[max_idx] + (z + b).ln_1p() - (k_u / kf).ln();
    hi = (R::one() + z) / ((R::one() + z + b) * kf);

    GeneralizedThresholds::new(Thresholds::with_range(t, lo, hi, m_first, n), MapKind::Exp)
}

/// One Newton step of the coupled nonlinear system described in
/// [`topk_entropy_biased_kkt_iterate`].
#[allow(clippy::too_many_arguments)]
pub fn topk_entropy_biased_kkt_iter_2<R: Float>(
    m: &[R],
    k: R,
    alpha: R,
    num_u: R,
    beta: R,
    s: R,
    t: R,
) -> (R, R) {
    let mut sum0 = R::zero();
    let mut sum1 = R::zero();
    for &ai in m {
        let x = lambert_w_exp(ai - t);
        sum0 = sum0 + x;
        sum1 = sum1 + x / (R::one() + x);
    }

    let half = R::from(0.5).unwrap();
    let (a_coef, b_coef, c_coef) = if s < half {
        let k_1_s = k / (R::one() - s);
        let a_coef = s * (k * k_1_s + (k * k + num_u) * alpha) + k * num_u;
        let b_coef = s * (s * k_1_s + k * (-s).ln_1p() + beta) - num_u * x_log_x(s);
        (a_coef, b_coef, s)
    } else {
        let z = R::one() - s;
        let a_coef = k * (k - num_u + num_u / (R::one() - z)) + (k * k + num_u) * alpha * z;
        let b_coef =
            k * ((R::one() - z) + x_log_x(z)) + z * (beta - num_u * (-z).ln_1p());
        (a_coef, b_coef, z)
    };

    let sum0_t_sum1 = sum0 + t * sum1;
    let k_u = k - num_u;
    let denom = a_coef * sum1 + alpha * (k_u * k_u) * c_coef;

    let new_s = k * (sum0_t_sum1 * k_u * c_coef + b_coef * sum1) / denom;
    let new_t = (a_coef * sum0_t_sum1 - alpha * k_u * b_coef) / denom;
    (new_s, new_t)
}

/// Drives [`topk_entropy_biased_kkt_iter_2`] from `(s0, t0)` to a fixed
/// point, clamping `s` into `[0, 1]` after every step. Returns the
/// converged `(s, t)` (or the best estimate if the iteration budget is
/// exhausted first).
#[allow(clippy::too_many_arguments)]
pub fn topk_entropy_biased_kkt_iterate<R: Float>(
    m: &[R],
    k: R,
    alpha: R,
    log_alpha_k: R,
    num_u: R,
    sum_u: R,
    s0: R,
    t0: R,
    max_iter: usize,
) -> (R, R) {
    let lb = R::zero();
    let ub = R::one();
    let eps = R::from(16.0).unwrap() * R::epsilon();
    let beta = sum_u + num_u + num_u * log_alpha_k;

    let mut s = s0;
    let mut t = t0;
    for _ in 0..max_iter {
        let s1 = s;
        let t1 = t;
        s = clamp(s, lb, ub);
        let (ns, nt) = topk_entropy_biased_kkt_iter_2(m, k, alpha, num_u, beta, s, t);
        s = ns;
        t = nt;
        if (s1 - s).abs() + (t1 - t).abs() <= eps {
            break;
        }
    }
    s = clamp(s, lb, ub);
    (s, t)
}

/// Solves
/// `min_{x,s} 0.5 alpha (<x, x> + s*s) + <x, log(x)> + (1 - s) log(1 - s)
/// - <a, x>` subject to `<1, x> = s`, `s <= 1`, `0 <= x_i <= s / k`.
///
/// The solution is `x = max(0, min(W_0(exp(a - t)) / alpha, hi))`. `alpha`
/// must be strictly positive.
pub fn thresholds_topk_entropy_biased<R: Float>(
    a: &mut [R],
    k: usize,
    alpha: R,
) -> GeneralizedThresholds<R> {
    let n = a.len();
    let kf = R::from(k).unwrap();
    let alpha_k = alpha / kf;
    let log_alpha_k = alpha_k.ln();

    let mut max_idx = max_index(a).unwrap();
    let eps = R::epsilon() * R::max(R::one(), a[max_idx]);

    let mut s = R::zero();
    let mut t = R::zero();
    let mut sum_u = R::zero();
    let mut min_u = R::infinity();
    let mut m_first = 0usize;
    let mut num_u = 0usize;

    loop {
        a.swap(m_first, max_idx);
        s = R::one();
        t = a[m_first];
        let (ns, nt) = topk_entropy_biased_kkt_iterate(
            &a[m_first..n],
            kf,
            alpha,
            log_alpha_k,
            R::from(num_u).unwrap(),
            sum_u,
            s,
            t,
            MAX_ITER,
        );
        s = ns;
        t = nt;

        num_u += 1;
        if num_u >= k {
            break;
        }

        let tt = lambert_w_exp_inverse(alpha_k * s) + t;
        if a[m_first] - eps <= tt && tt <= min_u + eps {
            break;
        }

        min_u = a[m_first];
        sum_u = sum_u + a[m_first];
        m_first += 1;
        max_idx = m_first + max_index(&a[m_first..n]).unwrap();
    }

    let lo = R::zero();
    let hi = s / kf;
    GeneralizedThresholds::new(
        Thresholds::with_range(t, lo, hi, m_first, n),
        MapKind::LambertWScaled(R::one() / alpha),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feasible_simplex<R: Float + std::fmt::Debug>(xs: &[R], hi: R, rhs: R, eps: R) {
        for &x in xs {
            assert!(x >= R::zero() - eps);
            assert!(x <= hi + eps);
        }
        let s = xs.iter().fold(R::zero(), |acc, &x| acc + x);
        assert!((s - rhs).abs() <= eps, "{:?} != {:?}", s, rhs);
    }

    #[test]
    fn entropy_projects_onto_the_simplex() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let gt = thresholds_entropy(&mut a, 1.0, 1.0);
        let mut xs = a.clone();
        gt.apply(&mut xs);
        feasible_simplex(&xs, 1.0, 1.0, 1e-8);
    }

    #[test]
    fn entropy_norm_is_feasible_and_converges() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let gt = thresholds_entropy_norm(&mut a, 1.0, 1.0);
        assert!(gt.base.converged);
        let mut xs = a.clone();
        gt.apply(&mut xs);
        feasible_simplex(&xs, 1.0, 1.0, 1e-6);
    }

    #[test]
    fn topk_entropy_is_feasible() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0, 2.0];
        let k = 2;
        let gt = thresholds_topk_entropy(&mut a, k);
        let mut xs = a.clone();
        gt.apply(&mut xs);
        let s: f64 = xs.iter().sum();
        assert!((s - 1.0).abs() < 1e-6 || s <= 1.0 + 1e-6);
        for &x in &xs {
            assert!(x >= -1e-9);
        }
    }

    #[test]
    fn topk_entropy_biased_is_feasible() {
        let mut a = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0, 2.0];
        let k = 2;
        let gt = thresholds_topk_entropy_biased(&mut a, k, 1.0);
        let mut xs = a.clone();
        gt.apply(&mut xs);
        for &x in &xs {
            assert!(x >= -1e-9);
            assert!(x <= gt.base.hi + 1e-9);
        }
    }
}
