// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Projection onto the top-k cone: `{x >= 0 : max_k(x) <= <1, x> / k}`
//! (and its `rho`-biased variant), the feasible set of the dual variables
//! for the top-k hinge loss.
//!
//! Both operators share the same three-way case split
//! ([`topk_cone_special_cases`]) before falling back to the general
//! U/M/L search, since the degenerate cases (everything maps to zero, or
//! only the top-k block is active) are common in practice and much
//! cheaper to detect than to search for.

use crate::knapsack::sort_desc;
use crate::thresholds::Thresholds;
use num_traits::Float;

/// Which of the three cases [`topk_cone_special_cases`] detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The whole input projects to zero.
    Zero,
    /// Only the top-`k` block is active; a closed-form threshold applies.
    Constant,
    /// No closed form; the caller must run the full U/M/L search.
    General,
}

/// Result of the case analysis: which case applies, and the closed-form
/// threshold when it does (meaningless for [`Projection::General`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopkConeCase<R> {
    /// Which case applies.
    pub projection: Projection,
    /// The threshold for [`Projection::Zero`]/[`Projection::Constant`].
    pub thresholds: Thresholds<R>,
}

/// Detects the two degenerate cases of the top-k cone projection before a
/// full search is needed: everything maps to zero, or only the top-`k`
/// elements end up active (scaled to a common value `hi`).
///
/// `a` is partially sorted around its `k`-th largest element (via a
/// selection, not a full sort) so that `a[..k]` are the `k` largest values
/// in some order. `div_const` is `k` for the unbiased cone, `k + rho*k*k`
/// for the biased one.
pub fn topk_cone_special_cases<R: Float>(a: &mut [R], k: usize, div_const: R) -> TopkConeCase<R> {
    let n = a.len();
    select_kth_largest(a, k);

    let eps = R::from(16.0).unwrap() * R::epsilon();
    let sum_k_largest = a[..k].iter().fold(R::zero(), |acc, &x| acc + x);

    if sum_k_largest <= eps {
        return TopkConeCase {
            projection: Projection::Zero,
            thresholds: Thresholds::with_range(R::zero(), R::zero(), R::zero(), 0, 0),
        };
    }

    let hi = sum_k_largest / div_const;
    let kth = a[k - 1];
    let t = kth - hi;
    let max_rest = a[k..].iter().fold(R::neg_infinity(), |acc, &x| R::max(acc, x));
    if k == n || t >= max_rest - eps {
        return TopkConeCase {
            projection: Projection::Constant,
            thresholds: Thresholds::with_range(t, R::zero(), hi, k, k),
        };
    }

    TopkConeCase {
        projection: Projection::General,
        thresholds: Thresholds::with_range(R::zero(), R::zero(), R::zero(), 0, 0),
    }
}

/// The general U/M/L search for the unbiased top-k cone, used when
/// [`topk_cone_special_cases`] reports [`Projection::General`].
pub fn thresholds_topk_cone_search<R: Float>(a: &mut [R], k: usize) -> Thresholds<R> {
    let n = a.len();
    sort_desc(a);
    let eps = R::from(16.0).unwrap() * R::epsilon();

    let mut k_minus_num_u = R::from(k).unwrap();
    let mut min_u = R::infinity();
    let mut num_u = R::zero();
    let mut sum_u = R::zero();

    let mut m_first = 0usize;
    loop {
        let d0 = k_minus_num_u * k_minus_num_u;
        let k_minus_num_u_sum_u = k_minus_num_u * sum_u;

        let mut sum_m = R::zero();
        let mut num_m_sum_u = R::zero();
        let mut d = d0;
        let mut min_m = R::infinity();
        let mut max_m = R::neg_infinity();

        let mut m_last = m_first;
        loop {
            let t = (num_u * sum_m - k_minus_num_u_sum_u) / d;
            let hi = (num_m_sum_u + k_minus_num_u * sum_m) / d;
            let tt = hi + t;
            if max_m - eps <= tt && tt <= min_u + eps {
                let last_ok = m_last == n || a[m_last] - eps <= t;
                if t <= min_m + eps && last_ok {
                    return Thresholds::with_range(t, R::zero(), hi, m_first, m_last);
                }
            }

            if m_last == n {
                break;
            }
            min_m = a[m_last];
            max_m = a[m_first];
            sum_m = sum_m + min_m;
            num_m_sum_u = num_m_sum_u + sum_u;
            d = d + num_u;
            m_last += 1;
        }

        if m_first == k {
            break;
        }
        min_u = a[m_first];
        sum_u = sum_u + min_u;
        k_minus_num_u = k_minus_num_u - R::one();
        num_u = num_u + R::one();
        m_first += 1;
    }

    Thresholds::with_range(R::zero(), R::zero(), R::zero(), 0, 0)
}

/// Projects onto `{x >= 0 : max_k(x) <= <1, x> / k}`, the feasible set of
/// the dual variables for the unbiased top-k hinge loss, i.e. solves
/// `min_x 0.5 <x, x> - <a, x>` subject to that constraint. The solution is
/// `x = max(0, min(a - t, hi))`.
pub fn thresholds_topk_cone<R: Float>(a: &mut [R], k: usize) -> Thresholds<R> {
    let case = topk_cone_special_cases(a, k, R::from(k).unwrap());
    match case.projection {
        Projection::General => thresholds_topk_cone_search(a, k),
        _ => case.thresholds,
    }
}

pub(crate) fn thresholds_topk_cone_biased_search<R: Float>(
    a: &mut [R],
    k: usize,
    rho: R,
) -> Thresholds<R> {
    let n = a.len();
    sort_desc(a);
    let eps = R::from(16.0).unwrap() * R::epsilon();
    let kf = R::from(k).unwrap();

    let mut k_minus_num_u = kf;
    let mut num_u_plus_rho_k2 = rho * kf * kf;
    let mut min_u = R::infinity();
    let mut sum_u = R::zero();

    let mut m_first = 0usize;
    loop {
        let d0 = k_minus_num_u * k_minus_num_u;
        let k_minus_num_u_sum_u = k_minus_num_u * sum_u;

        let mut sum_m = R::zero();
        let mut num_m_sum_u = R::zero();
        let mut d = d0;
        let mut min_m = R::infinity();
        let mut max_m = R::neg_infinity();

        let mut m_last = m_first;
        loop {
            let t = (num_u_plus_rho_k2 * sum_m - k_minus_num_u_sum_u) / d;
            let hi = (num_m_sum_u + k_minus_num_u * sum_m) / d;
            let tt = hi + t;
            if max_m - eps <= tt && tt <= min_u + eps {
                let last_ok = m_last == n || a[m_last] - eps <= t;
                if t <= min_m + eps && last_ok {
                    return Thresholds::with_range(t, R::zero(), hi, m_first, m_last);
                }
            }

            if m_last == n {
                break;
            }
            min_m = a[m_last];
            max_m = a[m_first];
            sum_m = sum_m + min_m;
            num_m_sum_u = num_m_sum_u + sum_u;
            d = d + num_u_plus_rho_k2;
            m_last += 1;
        }

        if m_first == k {
            break;
        }
        min_u = a[m_first];
        sum_u = sum_u + min_u;
        k_minus_num_u = k_minus_num_u - R::one();
        num_u_plus_rho_k2 = num_u_plus_rho_k2 + R::one();
        m_first += 1;
    }

    Thresholds::with_range(R::zero(), R::zero(), R::zero(), 0, 0)
}

/// Solves
/// `min_x 0.5 (<x, x> + rho <1, x>^2) - <a, x>` subject to
/// `0 <= x_i <= <1, x> / k`. The solution is `x = max(0, min(a - t, hi))`.
///
/// `rho` must be non-negative; `rho = 0` reduces to [`thresholds_topk_cone`].
pub fn thresholds_topk_cone_biased<R: Float>(a: &mut [R], k: usize, rho: R) -> Thresholds<R> {
    let kf = R::from(k).unwrap();
    let case = topk_cone_special_cases(a, k, kf + rho * kf * kf);
    match case.projection {
        Projection::General => thresholds_topk_cone_biased_search(a, k, rho),
        _ => case.thresholds,
    }
}

/// Reorders `xs` in place so that `xs[..k]` holds the `k` largest elements
/// (in unspecified order among themselves) and `xs[k]` is their minimum,
/// i.e. the exact value the sorted array would have at position `k`.
/// `xs[k..]` holds the rest, also unordered. A linear-time selection
/// (quickselect), matching the originating implementation's use of
/// `std::nth_element`.
fn select_kth_largest<R: Float>(xs: &mut [R], k: usize) {
    let n = xs.len();
    if k == 0 || n <= 1 {
        return;
    }
    let target = k - 1;
    let (mut lo, mut hi) = (0usize, n - 1);
    loop {
        if lo == hi {
            return;
        }
        let pivot = xs[(lo + hi) / 2];
        let mut i = lo;
        let mut j = hi;
        while i <= j {
            while xs[i] > pivot {
                i += 1;
            }
            while xs[j] < pivot {
                if j == 0 {
                    break;
                }
                j -= 1;
            }
            if i <= j {
                xs.swap(i, j);
                i += 1;
                if j == 0 {
                    break;
                }
                j -= 1;
            }
        }
        if target <= j {
            hi = j;
        } else if target >= i {
            lo = i;
        } else {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_nonpositive_projects_to_zero() {
        let mut a = vec![-1.0_f64, -2.0, -0.5];
        let t = thresholds_topk_cone(&mut a, 2);
        assert_eq!(t.hi, 0.0);
        let mut xs = a.clone();
        t.apply(&mut xs);
        assert!(xs.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn topk_cone_feasible_set() {
        let mut a = vec![5.0_f64, 4.0, 3.0, 0.1, -2.0];
        let k = 2;
        let t = thresholds_topk_cone(&mut a, k);
        let mut xs = a.clone();
        t.apply(&mut xs);
        for &x in &xs {
            assert!(x >= -1e-12);
        }
        let s: f64 = xs.iter().sum();
        let mut sorted = xs.clone();
        sorted.sort_by(|x, y| y.partial_cmp(x).unwrap());
        let max_k: f64 = sorted[..k].iter().sum::<f64>() / k as f64;
        for &x in &xs {
            assert!(x <= max_k + 1e-9, "{} > {}", x, max_k);
        }
        assert!(s >= -1e-9);
    }

    #[test]
    fn biased_cone_with_zero_rho_matches_unbiased() {
        let mut a1 = vec![5.0_f64, 4.0, 3.0, 0.1, -2.0];
        let mut a2 = a1.clone();
        let t1 = thresholds_topk_cone(&mut a1, 2);
        let t2 = thresholds_topk_cone_biased(&mut a2, 2, 0.0);
        assert!((t1.t - t2.t).abs() < 1e-10);
        assert!((t1.hi - t2.hi).abs() < 1e-10);
    }

    #[test]
    fn select_kth_largest_places_top_k_prefix() {
        let mut xs = vec![3.0_f64, 1.0, 4.0, 1.5, 5.0, 9.0, 2.6];
        select_kth_largest(&mut xs, 3);
        let mut top3 = xs[..3].to_vec();
        top3.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(top3, vec![9.0, 5.0, 4.0]);
    }
}
