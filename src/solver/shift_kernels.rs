//! Per-shift recurrences of multi-shift CG.
//!
//! These are not BLAS operations: the first three advance the scalar
//! parameters ζ, β, α of every shift from the unshifted CG scalars, the last
//! two broadcast per-shift scalars (or an unshifted vector) across stacked
//! per-shift vectors. All of them are stateless, check every length before
//! writing anything, and fully overwrite their outputs.
//!
//! Notation follows Jegerlehner, "Krylov space solvers for shifted linear
//! systems" (hep-lat/9612014): β is the negated CG step length, α the
//! direction-mixing coefficient, and ζ the ratio between a shifted residual
//! and the unshifted one.

use crate::error::{MultishiftError, Result};
use crate::scalar::Scalar;
use rayon::prelude::*;

use super::layout::StackedLayout;

fn check_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(MultishiftError::Dimension(format!(
            "{name} has length {len}, expected {expected}"
        )));
    }
    Ok(())
}

/// Compute ζ₁ for every shift:
///
/// ```text
/// ζ₁ = ζ₀ ζ₋₁ β₋₁ / ( β₀ α₀ (ζ₋₁ − ζ₀) + ζ₋₁ β₋₁ (1 − β₀ σ) )
/// ```
///
/// `beta_prev`, `beta` and `alpha` are the unshifted β₋₁, β₀ and α₀. For
/// σ = 0 the recurrence keeps ζ at exactly 1.
pub fn compute_next_zeta<T: Scalar>(
    zeta: &[T],
    zeta_prev: &[T],
    sigma: &[T],
    zeta_next: &mut [T],
    beta_prev: T,
    beta: T,
    alpha: T,
) -> Result<()> {
    let n_shifts = sigma.len();
    check_len("zeta_0", zeta.len(), n_shifts)?;
    check_len("zeta_m1", zeta_prev.len(), n_shifts)?;
    check_len("zeta_1", zeta_next.len(), n_shifts)?;

    for (((z1, &z0), &zm1), &s) in zeta_next.iter_mut().zip(zeta).zip(zeta_prev).zip(sigma) {
        *z1 = z0 * zm1 * beta_prev
            / (beta * alpha * (zm1 - z0) + zm1 * beta_prev * (T::one() - beta * s));
    }
    Ok(())
}

/// Compute β₀σ = β₀ ζ₁ / ζ₀ for every shift.
pub fn compute_next_beta_sigma<T: Scalar>(
    zeta_next: &[T],
    zeta: &[T],
    beta_sigma: &mut [T],
    beta: T,
) -> Result<()> {
    let n_shifts = zeta_next.len();
    check_len("zeta_0", zeta.len(), n_shifts)?;
    check_len("beta_sigma", beta_sigma.len(), n_shifts)?;

    for ((b, &z1), &z0) in beta_sigma.iter_mut().zip(zeta_next).zip(zeta) {
        *b = beta * z1 / z0;
    }
    Ok(())
}

/// Compute α₀σ = (α₀ / β₀) ζ₁ β₀σ / ζ₀ for every shift.
///
/// `alpha` is the unshifted α₀ of the current iteration (already advanced).
pub fn compute_next_alpha_sigma<T: Scalar>(
    zeta: &[T],
    zeta_next: &[T],
    beta_sigma: &[T],
    alpha_sigma: &mut [T],
    beta: T,
    alpha: T,
) -> Result<()> {
    let n_shifts = zeta.len();
    check_len("zeta_1", zeta_next.len(), n_shifts)?;
    check_len("beta_sigma", beta_sigma.len(), n_shifts)?;
    check_len("alpha_sigma", alpha_sigma.len(), n_shifts)?;

    let ratio = alpha / beta;
    for (((a, &z0), &z1), &b) in alpha_sigma
        .iter_mut()
        .zip(zeta)
        .zip(zeta_next)
        .zip(beta_sigma)
    {
        *a = ratio * z1 * b / z0;
    }
    Ok(())
}

/// Advance every shifted solution and search direction:
///
/// ```text
/// x_σ ← x_σ − β₀σ p_σ
/// p_σ ← ζ₁ r + α₀σ p_σ
/// ```
///
/// Both updates read the same pre-update `p_σ`. Blocks are processed in
/// parallel; each element is read once and both outputs written from that
/// snapshot.
pub fn update_shifted_solution_and_direction<T: Scalar>(
    alpha_sigma: &[T],
    zeta_next: &[T],
    beta_sigma: &[T],
    r: &[T],
    x_sigma: &mut [T],
    p_sigma: &mut [T],
) -> Result<()> {
    let n_shifts = alpha_sigma.len();
    check_len("zeta_1", zeta_next.len(), n_shifts)?;
    check_len("beta_sigma", beta_sigma.len(), n_shifts)?;
    let layout = StackedLayout::new(r.len(), n_shifts);
    layout.check("x_sigma", x_sigma.len())?;
    layout.check("p_sigma", p_sigma.len())?;

    layout
        .blocks_mut(x_sigma)
        .zip(layout.blocks_mut(p_sigma))
        .enumerate()
        .for_each(|(s, (x_block, p_block))| {
            let (a, z, b) = (alpha_sigma[s], zeta_next[s], beta_sigma[s]);
            for ((xi, pi), &rk) in x_block.iter_mut().zip(p_block.iter_mut()).zip(r) {
                let p_old = *pi;
                *xi -= b * p_old;
                *pi = z * rk + a * p_old;
            }
        });
    Ok(())
}

/// Replicate `source` into every block of the stacked vector `dest`.
pub fn broadcast_replicate<T: Scalar>(source: &[T], dest: &mut [T]) -> Result<()> {
    let layout = StackedLayout::from_total(dest.len(), source.len())?;
    layout
        .blocks_mut(dest)
        .for_each(|block| block.copy_from_slice(source));
    Ok(())
}
