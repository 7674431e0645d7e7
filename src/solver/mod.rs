//! Shifted-system solvers.

pub mod backend;
pub mod cg_m;
pub mod layout;
pub mod monitor;
pub mod shift_kernels;

use crate::scalar::Scalar;

/// A linear operator `y = A * x`.
pub trait LinearOperator<T: Scalar>: Sync {
    fn nrows(&self) -> usize;

    fn ncols(&self) -> usize;

    /// Compute `y = A * x`. `y` is pre-sized to `nrows()`.
    fn apply(&self, x: &[T], y: &mut [T]);
}

/// The operator `A + σI`, built on top of an existing square operator.
///
/// Used to measure true residuals of the shifted systems after a solve.
pub struct Shifted<'a, A, T> {
    inner: &'a A,
    shift: T,
}

impl<'a, A, T> Shifted<'a, A, T> {
    pub fn new(inner: &'a A, shift: T) -> Self {
        Self { inner, shift }
    }
}

impl<A: LinearOperator<T>, T: Scalar> LinearOperator<T> for Shifted<'_, A, T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    fn apply(&self, x: &[T], y: &mut [T]) {
        self.inner.apply(x, y);
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi += self.shift * xi;
        }
    }
}

/// Relative residual `||(A + σI) x - b|| / ||b||` of one shifted system.
///
/// Returns the absolute residual norm when `b` is zero.
pub fn shifted_residual<T: Scalar, A: LinearOperator<T>>(a: &A, shift: T, x: &[T], b: &[T]) -> f64 {
    let mut ax = vec![T::zero(); a.nrows()];
    Shifted::new(a, shift).apply(x, &mut ax);
    let r_norm = ax
        .iter()
        .zip(b)
        .map(|(&axi, &bi)| (axi - bi).modulus().powi(2))
        .sum::<f64>()
        .sqrt();
    let b_norm = b.iter().map(|bi| bi.modulus().powi(2)).sum::<f64>().sqrt();
    if b_norm > 0.0 {
        r_norm / b_norm
    } else {
        r_norm
    }
}
