// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Numerically stable log-sum-exp kernels, shifted by the maximum element
//! so that the only `exp` calls made are of non-positive arguments.

use num_traits::Float;

/// `log(sum_i exp(a_i))`, or `0` for an empty slice.
pub fn log_sum_exp<R: Float>(a: &[R]) -> R {
    let mut s = R::zero();
    log_sum_exp_with_tail(a, &mut s)
}

/// `log(sum_i exp(a_i))`, additionally setting `*tail` to
/// `sum_i exp(a_i - max)` over all elements except the maximum. Returns `0`
/// (and sets `*tail = 0`) for an empty slice.
pub fn log_sum_exp_with_tail<R: Float>(a: &[R], tail: &mut R) -> R {
    match max_index(a) {
        None => {
            *tail = R::zero();
            R::zero()
        }
        Some(max_idx) => {
            let max = a[max_idx];
            let mut s = R::zero();
            for (i, &ai) in a.iter().enumerate() {
                if i != max_idx {
                    s = s + (ai - max).exp();
                }
            }
            *tail = s;
            max + s.ln_1p()
        }
    }
}

/// `log(1 + sum_i exp(a_i))`, or `0` for an empty slice.
pub fn log_1_sum_exp<R: Float>(a: &[R]) -> R {
    match max_index(a) {
        None => R::zero(),
        Some(max_idx) => {
            let max = a[max_idx];
            let s0 = (-max).exp();
            if !s0.is_finite() {
                return R::zero();
            }
            let mut s = s0;
            for (i, &ai) in a.iter().enumerate() {
                if i != max_idx {
                    s = s + (ai - max).exp();
                }
            }
            max + s.ln_1p()
        }
    }
}

/// Computes both `lse = log(sum_i exp(a_i))` and
/// `lse1 = log(1 + sum_i exp(a_i))` in a single pass, returning the tail sum
/// `s = sum_i exp(a_i - max)` over all elements except the maximum. For an
/// empty slice returns `0` and sets `lse = lse1 = 0`.
pub fn log_sum_exp_dual<R: Float>(a: &[R]) -> (R, R, R) {
    match max_index(a) {
        None => (R::zero(), R::zero(), R::zero()),
        Some(max_idx) => {
            let max = a[max_idx];
            let mut s = R::zero();
            for (i, &ai) in a.iter().enumerate() {
                if i != max_idx {
                    s = s + (ai - max).exp();
                }
            }
            let lse = max + s.ln_1p();
            let lse1_seed = (-max).exp();
            let lse1 = if lse1_seed.is_finite() {
                max + (s + lse1_seed).ln_1p()
            } else {
                R::zero()
            };
            (lse, lse1, s)
        }
    }
}

pub(crate) fn max_index<R: Float>(a: &[R]) -> Option<usize> {
    a.iter()
        .enumerate()
        .fold(None, |best, (i, &x)| match best {
            None => Some(i),
            Some(j) if x > a[j] => Some(i),
            Some(j) => Some(j),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_direct_computation_for_small_values() {
        let a = [0.1_f64, 0.2, 0.3];
        let direct = a.iter().map(|x| x.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&a) - direct).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_is_stable_for_large_values() {
        let a = [1000.0_f64, 1000.5, 999.0];
        let lse = log_sum_exp(&a);
        assert!(lse.is_finite());
        assert!(lse > 1000.0);
    }

    #[test]
    fn log_sum_exp_empty_is_zero() {
        let a: [f64; 0] = [];
        assert_eq!(log_sum_exp(&a), 0.0);
    }

    #[test]
    fn log_1_sum_exp_matches_direct_computation() {
        let a = [0.1_f64, 0.2, 0.3];
        let direct = (1.0 + a.iter().map(|x| x.exp()).sum::<f64>()).ln();
        assert!((log_1_sum_exp(&a) - direct).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_dual_agrees_with_individual_functions() {
        let a = [0.1_f64, -0.4, 2.0, 0.0];
        let (lse, lse1, _) = log_sum_exp_dual(&a);
        assert!((lse - log_sum_exp(&a)).abs() < 1e-12);
        assert!((lse1 - log_1_sum_exp(&a)).abs() < 1e-12);
    }
}
