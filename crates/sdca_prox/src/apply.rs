// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// sdca: proximal/projection operators for top-k SDCA classification.
// Dual licensed under Apache 2.0 and MIT.
// See:
//      - LICENSE-APACHE.md
//      - LICENSE-MIT.md
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Validated entry points: parameter-domain checks, auxiliary-buffer
//! materialization, threshold computation, and application, composed the
//! way the originating implementation's `prox(first, last, compute,
//! params...)` overloads do — except every domain error that implementation
//! only caught with an `assert` is here a typed [`ProxError`] returned
//! before any floating-point work happens.
//!
//! Each `thresholds_*` function in the sibling modules takes and may
//! reorder a caller-provided auxiliary buffer; the `prox_*` functions here
//! copy the input into that buffer, compute the threshold, and apply it
//! back onto the original (unreordered) input — mirroring the distinction
//! the teacher's and originating implementation's two-buffer `prox`
//! overload draws between the scratch copy and the caller's vector.

use sdca_error::{ProxError, ProxResult};

use crate::entropy::{
    thresholds_entropy, thresholds_entropy_norm, thresholds_topk_entropy,
    thresholds_topk_entropy_biased,
};
use crate::knapsack::{thresholds_knapsack_eq, thresholds_knapsack_le, thresholds_knapsack_le_biased};
use crate::thresholds::{dot_prox_prox as dot_prox_prox_raw, dot_x_prox as dot_x_prox_raw, Thresholds};
use crate::topk_cone::{thresholds_topk_cone, thresholds_topk_cone_biased};
use crate::topk_simplex::{thresholds_topk_simplex, thresholds_topk_simplex_biased};
use crate::two_block::{thresholds_two_entropy, thresholds_two_simplex, thresholds_two_simplex_sort};
use num_traits::Float;

fn check_nonempty<R>(x: &[R]) -> ProxResult<()> {
    if x.is_empty() {
        Err(ProxError::EmptyRange)
    } else {
        Ok(())
    }
}

fn check_same_len<R>(a: &[R], b: &[R]) -> ProxResult<()> {
    if a.len() != b.len() {
        Err(ProxError::MismatchedRangeLength {
            a_len: a.len(),
            b_len: b.len(),
        })
    } else {
        Ok(())
    }
}

fn check_positive_rhs<R: Float>(rhs: R) -> ProxResult<()> {
    if rhs > R::zero() {
        Ok(())
    } else {
        Err(ProxError::NonPositiveRhs {
            rhs: rhs.to_f64().unwrap_or(f64::NAN),
        })
    }
}

fn check_positive_alpha<R: Float>(alpha: R) -> ProxResult<()> {
    if alpha > R::zero() {
        Ok(())
    } else {
        Err(ProxError::NonPositiveAlpha {
            alpha: alpha.to_f64().unwrap_or(f64::NAN),
        })
    }
}

fn check_topk(k: usize, dim: usize) -> ProxResult<()> {
    if k >= 1 && k <= dim {
        Ok(())
    } else {
        Err(ProxError::InvalidTopK { k, dim })
    }
}

/// The top-k entropy family additionally excludes `k == dim`: the
/// `(1 - s) log(1 - s)` term in its objective requires at least one
/// coordinate outside the active top-k group.
fn check_topk_entropy(k: usize, dim: usize) -> ProxResult<()> {
    if k >= 1 && k < dim {
        Ok(())
    } else {
        Err(ProxError::InvalidTopK { k, dim })
    }
}

/// Projects `x` onto the box `[lo, hi]` intersected with `<1, x> = rhs`, a
/// direct wrapper around [`crate::knapsack::thresholds_knapsack_eq`]. `aux`
/// is scratch space, overwritten with an unspecified permutation of `x`.
pub fn prox_knapsack_eq<R: Float>(x: &mut [R], aux: &mut [R], lo: R, hi: R, rhs: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    aux.copy_from_slice(x);
    let t = thresholds_knapsack_eq(aux, lo, hi, rhs);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the box `[lo, hi]` intersected with `<1, x> <= rhs`.
pub fn prox_knapsack_le<R: Float>(x: &mut [R], aux: &mut [R], lo: R, hi: R, rhs: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    aux.copy_from_slice(x);
    let t = thresholds_knapsack_le(aux, lo, hi, rhs);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the box `[lo, hi]` intersected with the `rho`-biased
/// budget `<1, x> <= rhs`.
pub fn prox_knapsack_le_biased<R: Float>(
    x: &mut [R],
    aux: &mut [R],
    lo: R,
    hi: R,
    rhs: R,
    rho: R,
) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    aux.copy_from_slice(x);
    let t = thresholds_knapsack_le_biased(aux, lo, hi, rhs, rho);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the top-`k` cone.
pub fn prox_topk_cone<R: Float>(x: &mut [R], aux: &mut [R], k: usize) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk(k, x.len())?;
    aux.copy_from_slice(x);
    let t = thresholds_topk_cone(aux, k);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the `rho`-biased top-`k` cone.
pub fn prox_topk_cone_biased<R: Float>(x: &mut [R], aux: &mut [R], k: usize, rho: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk(k, x.len())?;
    aux.copy_from_slice(x);
    let t = thresholds_topk_cone_biased(aux, k, rho);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the top-`k` simplex: the top-`k` cone intersected
/// with `<1, x> <= rhs`.
pub fn prox_topk_simplex<R: Float>(x: &mut [R], aux: &mut [R], k: usize, rhs: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk(k, x.len())?;
    check_positive_rhs(rhs)?;
    aux.copy_from_slice(x);
    let t = thresholds_topk_simplex(aux, k, rhs);
    t.apply(x);
    Ok(())
}

/// Projects `x` onto the `rho`-biased top-`k` simplex.
pub fn prox_topk_simplex_biased<R: Float>(
    x: &mut [R],
    aux: &mut [R],
    k: usize,
    rhs: R,
    rho: R,
) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk(k, x.len())?;
    check_positive_rhs(rhs)?;
    aux.copy_from_slice(x);
    let t = thresholds_topk_simplex_biased(aux, k, rhs, rho);
    t.apply(x);
    Ok(())
}

/// Applies the entropy-regularized simplex projection (proximal operator
/// of `<x, log(x)>` relative to the box `[0, hi]` and budget `rhs`).
pub fn prox_entropy<R: Float>(x: &mut [R], aux: &mut [R], hi: R, rhs: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_positive_rhs(rhs)?;
    aux.copy_from_slice(x);
    let gt = thresholds_entropy(aux, hi, rhs);
    gt.apply(x);
    Ok(())
}

/// Applies the entropy-and-quadratic-regularized simplex projection.
pub fn prox_entropy_norm<R: Float>(x: &mut [R], aux: &mut [R], hi: R, rhs: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_positive_rhs(rhs)?;
    aux.copy_from_slice(x);
    let gt = thresholds_entropy_norm(aux, hi, rhs);
    gt.apply(x);
    Ok(())
}

/// Applies the top-`k` entropy projection used by the top-`k` softmax
/// (multi-label cross-entropy) dual.
pub fn prox_topk_entropy<R: Float>(x: &mut [R], aux: &mut [R], k: usize) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk_entropy(k, x.len())?;
    aux.copy_from_slice(x);
    let gt = thresholds_topk_entropy(aux, k);
    gt.apply(x);
    Ok(())
}

/// Applies the `alpha`-scaled top-`k` entropy projection.
pub fn prox_topk_entropy_biased<R: Float>(
    x: &mut [R],
    aux: &mut [R],
    k: usize,
    alpha: R,
) -> ProxResult<()> {
    check_nonempty(x)?;
    check_same_len(x, aux)?;
    check_topk_entropy(k, x.len())?;
    check_positive_alpha(alpha)?;
    aux.copy_from_slice(x);
    let gt = thresholds_topk_entropy_biased(aux, k, alpha);
    gt.apply(x);
    Ok(())
}

/// Jointly projects `x` and `y` onto their coupled simplices via variable
/// fixing (see [`crate::two_block::thresholds_two_simplex`]).
pub fn prox_two_simplex<R: Float>(
    x: &mut [R],
    y: &mut [R],
    x_aux: &mut [R],
    y_aux: &mut [R],
    rhs: R,
) -> ProxResult<()> {
    check_nonempty(x)?;
    check_nonempty(y)?;
    check_same_len(x, x_aux)?;
    check_same_len(y, y_aux)?;
    check_positive_rhs(rhs)?;
    x_aux.copy_from_slice(x);
    y_aux.copy_from_slice(y);
    let (tx, ty) = thresholds_two_simplex(x_aux, y_aux, rhs);
    tx.apply(x);
    ty.apply(y);
    Ok(())
}

/// Jointly projects `x` and `y` onto their coupled simplices via the
/// sorted-sweep algorithm (see
/// [`crate::two_block::thresholds_two_simplex_sort`]).
pub fn prox_two_simplex_sort<R: Float>(
    x: &mut [R],
    y: &mut [R],
    x_aux: &mut [R],
    y_aux: &mut [R],
    rhs: R,
) -> ProxResult<()> {
    check_nonempty(x)?;
    check_nonempty(y)?;
    check_same_len(x, x_aux)?;
    check_same_len(y, y_aux)?;
    check_positive_rhs(rhs)?;
    x_aux.copy_from_slice(x);
    y_aux.copy_from_slice(y);
    let (tx, ty) = thresholds_two_simplex_sort(x_aux, y_aux, rhs);
    tx.apply(x);
    ty.apply(y);
    Ok(())
}

/// Jointly projects `x` and `y` onto their coupled entropy-regularized
/// simplices (see [`crate::two_block::thresholds_two_entropy`]). Does not
/// need an auxiliary buffer since the underlying solve never reorders its
/// input.
pub fn prox_two_entropy<R: Float>(x: &mut [R], y: &mut [R], alpha: R) -> ProxResult<()> {
    check_nonempty(x)?;
    check_nonempty(y)?;
    check_positive_alpha(alpha)?;
    let (gx, gy) = thresholds_two_entropy(x, y, alpha);
    gx.apply(x);
    gy.apply(y);
    Ok(())
}

/// Applies `prox_fn` independently to each contiguous row of length `dim`
/// within the flattened matrix `x`, reusing `aux` (length `dim`) as scratch
/// for every row. This is the shape the driver's per-example update takes:
/// one label vector per row, one proximal solve per row.
pub fn apply_rows<R: Float>(
    x: &mut [R],
    dim: usize,
    aux: &mut [R],
    mut prox_fn: impl FnMut(&mut [R], &mut [R]) -> ProxResult<()>,
) -> ProxResult<()> {
    if dim == 0 || x.len() % dim != 0 {
        return Err(ProxError::EmptyRange);
    }
    if aux.len() != dim {
        return Err(ProxError::MismatchedRangeLength {
            a_len: dim,
            b_len: aux.len(),
        });
    }
    for row in x.chunks_mut(dim) {
        prox_fn(row, aux)?;
    }
    Ok(())
}

/// Computes `<prox(x), prox(x)>` for the knapsack/cone/simplex family
/// (plain [`Thresholds`]) without materializing `prox(x)`. `xs` must be the
/// same (possibly reordered) buffer the threshold was computed over.
pub fn dot_prox_prox<R: Float>(t: &Thresholds<R>, xs: &[R]) -> R {
    dot_prox_prox_raw(t, xs)
}

/// Computes `<x, prox(x)>` for the knapsack/cone/simplex family; see
/// [`dot_prox_prox`].
pub fn dot_x_prox<R: Float>(t: &Thresholds<R>, xs: &[R]) -> R {
    dot_x_prox_raw(t, xs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prox_topk_simplex_validates_k() {
        let mut x = vec![1.0_f64, 2.0, 3.0];
        let mut aux = vec![0.0_f64; 3];
        let err = prox_topk_simplex(&mut x, &mut aux, 0, 1.0).unwrap_err();
        assert_eq!(err, ProxError::InvalidTopK { k: 0, dim: 3 });

        let err = prox_topk_simplex(&mut x, &mut aux, 5, 1.0).unwrap_err();
        assert_eq!(err, ProxError::InvalidTopK { k: 5, dim: 3 });
    }

    #[test]
    fn prox_topk_simplex_validates_rhs() {
        let mut x = vec![1.0_f64, 2.0, 3.0];
        let mut aux = vec![0.0_f64; 3];
        let err = prox_topk_simplex(&mut x, &mut aux, 2, -1.0).unwrap_err();
        assert_eq!(err, ProxError::NonPositiveRhs { rhs: -1.0 });
    }

    #[test]
    fn prox_knapsack_eq_rejects_empty_input() {
        let mut x: Vec<f64> = vec![];
        let mut aux: Vec<f64> = vec![];
        let err = prox_knapsack_eq(&mut x, &mut aux, 0.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err, ProxError::EmptyRange);
    }

    #[test]
    fn prox_knapsack_eq_rejects_aux_length_mismatch() {
        let mut x = vec![1.0_f64, 2.0];
        let mut aux = vec![0.0_f64; 3];
        let err = prox_knapsack_eq(&mut x, &mut aux, 0.0, 1.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            ProxError::MismatchedRangeLength { a_len: 2, b_len: 3 }
        );
    }

    #[test]
    fn prox_knapsack_eq_projects_in_place() {
        let mut x = vec![3.0_f64, 1.0, 0.2, -1.0, 5.0];
        let mut aux = vec![0.0_f64; 5];
        prox_knapsack_eq(&mut x, &mut aux, 0.0, 1.0, 1.0).unwrap();
        let s: f64 = x.iter().sum();
        crate::assert_approx_eq!(s, 1.0, 1e-9);
    }

    #[test]
    fn apply_rows_projects_each_row_independently() {
        let mut x = vec![3.0_f64, 1.0, 0.2, 1.0, 1.0, 1.0];
        let mut aux = vec![0.0_f64; 3];
        apply_rows(&mut x, 3, &mut aux, |row, aux| {
            prox_knapsack_eq(row, aux, 0.0, 1.0, 1.0)
        })
        .unwrap();
        let row0: f64 = x[..3].iter().sum();
        let row1: f64 = x[3..].iter().sum();
        assert!((row0 - 1.0).abs() < 1e-9);
        assert!((row1 - 1.0).abs() < 1e-9);
    }
}
