// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Scalar primitives shared by every operator: the clamp used to apply a
//! threshold, `x log x` / `x exp x`, and the Lambert W function composed
//! with `exp`, `lambert_w_exp(x) = W_0(exp(x))`, which several of the
//! entropy-family operators invert instead of a plain exponential.

use num_traits::Float;

/// Clamps `x` into `[lo, hi]`.
#[inline]
pub fn clamp<R: Float>(x: R, lo: R, hi: R) -> R {
    Float::max(lo, Float::min(x, hi))
}

/// `x * exp(x)`.
#[inline]
pub fn x_exp_x<R: Float>(x: R) -> R {
    x * x.exp()
}

/// `x * log(x)`, with the continuous extension `0 * log(0) = 0`.
#[inline]
pub fn x_log_x<R: Float>(x: R) -> R {
    if x > R::zero() {
        x * x.ln()
    } else {
        R::zero()
    }
}

/// Single Householder iteration of order 5 for `w - z * exp(-w) = 0`.
///
/// `w` is the current iterate and `y = z * exp(-w)`. Returns the next
/// iterate. This is the inner step used by [`lambert_w_exp`]; exposed
/// separately because the root finder for [`lambert_w_exp`] needs a custom
/// seed in different regions of `x`.
#[inline]
pub fn lambert_w_iter_5<R: Float>(w: R, y: R) -> R {
    let four = R::from(4.0).unwrap();
    let six = R::from(6.0).unwrap();
    let eight = R::from(8.0).unwrap();
    let fourteen = R::from(14.0).unwrap();
    let twenty_four = R::from(24.0).unwrap();
    let thirty_six = R::from(36.0).unwrap();

    let f0 = w - y;
    let f1 = R::one() + y;
    let f11 = f1 * f1;
    let f0y = f0 * y;
    let f00y = f0 * f0y;
    w - four * f0 * (six * f1 * (f11 + f0y) + f00y)
        / (f11 * (twenty_four * f11 + thirty_six * f0y) + f00y * (fourteen * y + f0 + eight))
}

/// Crude approximation of `exp(x)` via `(1 + x / 1024)^1024`, accurate to
/// about `0.1%` for `x` in `[-1024, 1]`. Used only to seed the Householder
/// iteration in [`lambert_w_exp`]; the seed does not need to be exact.
#[inline]
pub fn exp_approx<R: Float>(x: R) -> R {
    let denom = R::from(1024.0).unwrap();
    let mut y = R::one() + x / denom;
    for _ in 0..10 {
        y = y * y;
    }
    y
}

/// `W_0(exp(x))`, the principal branch of the Lambert W function composed
/// with `exp`. Computed `w` satisfies `w + ln(w) = x`, equivalently
/// `w * exp(w) = exp(x)`.
///
/// Uses the interval partition and seeding strategy for `f64` from the
/// originating implementation, instantiated generically over any
/// [`Float`]; see `DESIGN.md` for why a single generic interval schedule is
/// used instead of per-precision specializations.
pub fn lambert_w_exp<R: Float>(x: R) -> R {
    let zero = R::zero();
    let one = R::one();
    let four = R::from(4.0).unwrap();
    let thirty_six = R::from(36.0).unwrap();
    let twenty = R::from(20.0).unwrap();
    let seven_forty_six = R::from(746.0).unwrap();
    let huge = R::from(576460752303423488.0_f64).unwrap();

    let w = if x > zero {
        if x <= four {
            lambert_w_iter_5(x, one)
        } else if x <= huge {
            let w0 = x - x.ln();
            lambert_w_iter_5(w0, x)
        } else {
            return x;
        }
    } else if x > -thirty_six {
        let mut w0 = exp_approx(x);
        if x > -twenty {
            w0 = lambert_w_iter_5(w0, exp_approx(x - w0));
        }
        w0
    } else {
        return if x > -seven_forty_six { x.exp() } else { zero };
    };
    lambert_w_iter_5(w, (x - w).exp())
}

/// Inverse of [`lambert_w_exp`]: `x = w + ln(w)`.
#[inline]
pub fn lambert_w_exp_inverse<R: Float>(w: R) -> R {
    w + w.ln()
}

/// `sum_i W_0(exp(a_i + t))`.
pub fn sum_lambert_w_exp<R: Float>(a: &[R], t: R) -> R {
    a.iter().fold(R::zero(), |acc, &ai| acc + lambert_w_exp(ai + t))
}

/// `sum_i W_0(exp(a_i + t))` and its first derivative with respect to `t`.
pub fn sum_lambert_w_exp_d1<R: Float>(a: &[R], t: R) -> (R, R) {
    let (mut f0, mut f1) = (R::zero(), R::zero());
    for &ai in a {
        let v = lambert_w_exp(ai + t);
        f0 = f0 + v;
        f1 = f1 + v / (R::one() + v);
    }
    (f0, f1)
}

/// `sum_i W_0(exp(a_i + t))` and its first two derivatives with respect to `t`.
pub fn sum_lambert_w_exp_d2<R: Float>(a: &[R], t: R) -> (R, R, R) {
    let (mut f0, mut f1, mut f2) = (R::zero(), R::zero(), R::zero());
    for &ai in a {
        let v = lambert_w_exp(ai + t);
        let d = R::one() + v;
        f0 = f0 + v;
        f1 = f1 + v / d;
        f2 = f2 + v / (d * d * d);
    }
    (f0, f1, f2)
}

/// `sum_i W_0(exp(a_i + t))` and its first three derivatives with respect to `t`.
pub fn sum_lambert_w_exp_d3<R: Float>(a: &[R], t: R) -> (R, R, R, R) {
    let (mut f0, mut f1, mut f2, mut f3) = (R::zero(), R::zero(), R::zero(), R::zero());
    let two = R::from(2.0).unwrap();
    for &ai in a {
        let v = lambert_w_exp(ai + t);
        let d = R::one() + v;
        let d3 = d * d * d;
        f0 = f0 + v;
        f1 = f1 + v / d;
        f2 = f2 + v / d3;
        f3 = f3 + v * (R::one() - two * v) / (d3 * d * d);
    }
    (f0, f1, f2, f3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_values_in_range() {
        assert_eq!(clamp(5.0_f64, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0_f64, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5_f64, 0.0, 1.0), 0.5);
    }

    #[test]
    fn x_log_x_is_zero_at_origin() {
        assert_eq!(x_log_x(0.0_f64), 0.0);
        assert!((x_log_x(1.0_f64) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn lambert_w_exp_at_zero_is_omega() {
        // W_0(exp(0)) = W_0(1) = Omega, the omega constant.
        let omega = 0.5671432904097838_f64;
        assert!((lambert_w_exp(0.0_f64) - omega).abs() < 1e-13);
    }

    #[test]
    fn lambert_w_exp_round_trips_through_inverse() {
        for &x in &[-50.0_f64, -5.0, -0.5, 0.0, 0.5, 5.0, 50.0, 1e6] {
            let w = lambert_w_exp(x);
            assert!((lambert_w_exp_inverse(w) - x).abs() < 1e-6 * x.abs().max(1.0));
        }
    }

    #[test]
    fn lambert_w_exp_underflows_to_zero_for_very_negative_x() {
        assert_eq!(lambert_w_exp(-1000.0_f64), 0.0);
    }

    #[test]
    fn lambert_w_exp_is_identity_for_huge_x() {
        let x = 1e20_f64;
        assert_eq!(lambert_w_exp(x), x);
    }
}
