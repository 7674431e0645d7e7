//! Vector primitive backends.
//!
//! Defines the `SolverBackend` trait for backend-agnostic iterative solvers,
//! with a serial reference implementation and a rayon data-parallel one.

use crate::scalar::Scalar;
use rayon::prelude::*;

/// Below this length the rayon backend falls back to serial loops.
const PAR_THRESHOLD: usize = 4096;

/// Abstract backend for the BLAS-1 operations the solver needs.
///
/// Every operation is a synchronous bulk call: it completes before it
/// returns. Length checks are the caller's job.
pub trait SolverBackend<T: Scalar>: Sync {
    /// Copy: dst = src
    fn copy(&self, src: &[T], dst: &mut [T]);

    /// Fill: x[i] = value
    fn fill(&self, x: &mut [T], value: T);

    /// Scale: x = alpha * x (in-place)
    fn scale(&self, alpha: T, x: &mut [T]);

    /// AXPY: y = alpha * x + y (in-place on y)
    fn axpy(&self, alpha: T, x: &[T], y: &mut [T]);

    /// Conjugated inner product: sum of conj(x[i]) * y[i].
    fn dotc(&self, x: &[T], y: &[T]) -> T;

    /// Euclidean norm.
    fn norm2(&self, x: &[T]) -> f64 {
        self.dotc(x, x).modulus().sqrt()
    }
}

/// Single-threaded backend. Useful as a reference and for tiny systems.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl<T: Scalar> SolverBackend<T> for SerialBackend {
    fn copy(&self, src: &[T], dst: &mut [T]) {
        dst.copy_from_slice(src);
    }

    fn fill(&self, x: &mut [T], value: T) {
        x.fill(value);
    }

    fn scale(&self, alpha: T, x: &mut [T]) {
        for xi in x.iter_mut() {
            *xi = alpha * *xi;
        }
    }

    fn axpy(&self, alpha: T, x: &[T], y: &mut [T]) {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }

    fn dotc(&self, x: &[T], y: &[T]) -> T {
        x.iter()
            .zip(y)
            .fold(T::zero(), |acc, (&xi, &yi)| acc + xi.conj() * yi)
    }
}

/// Data-parallel backend built on rayon.
#[derive(Debug, Default, Clone, Copy)]
pub struct RayonBackend;

impl<T: Scalar> SolverBackend<T> for RayonBackend {
    fn copy(&self, src: &[T], dst: &mut [T]) {
        if src.len() < PAR_THRESHOLD {
            return SerialBackend.copy(src, dst);
        }
        dst.par_iter_mut()
            .zip(src.par_iter())
            .for_each(|(d, &s)| *d = s);
    }

    fn fill(&self, x: &mut [T], value: T) {
        if x.len() < PAR_THRESHOLD {
            return SerialBackend.fill(x, value);
        }
        x.par_iter_mut().for_each(|xi| *xi = value);
    }

    fn scale(&self, alpha: T, x: &mut [T]) {
        if x.len() < PAR_THRESHOLD {
            return SerialBackend.scale(alpha, x);
        }
        x.par_iter_mut().for_each(|xi| *xi = alpha * *xi);
    }

    fn axpy(&self, alpha: T, x: &[T], y: &mut [T]) {
        if x.len() < PAR_THRESHOLD {
            return SerialBackend.axpy(alpha, x, y);
        }
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| *yi += alpha * xi);
    }

    fn dotc(&self, x: &[T], y: &[T]) -> T {
        if x.len() < PAR_THRESHOLD {
            return SerialBackend.dotc(x, y);
        }
        x.par_iter()
            .zip(y.par_iter())
            .map(|(&xi, &yi)| xi.conj() * yi)
            .reduce(T::zero, |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    fn check_backend<B: SolverBackend<f64>>(backend: &B, n: usize) {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut y = vec![0.0; n];

        backend.copy(&x, &mut y);
        assert_eq!(x, y);

        backend.scale(2.0, &mut y);
        backend.axpy(-1.0, &x, &mut y);
        assert_eq!(x, y);

        let expected: f64 = (0..n).map(|i| (i * i) as f64).sum();
        assert_abs_diff_eq!(backend.dotc(&x, &y), expected, epsilon = 1e-6 * expected);

        backend.fill(&mut y, 3.0);
        assert!(y.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn serial_backend_primitives() {
        check_backend(&SerialBackend, 17);
    }

    #[test]
    fn rayon_backend_primitives_small_and_large() {
        check_backend(&RayonBackend, 17);
        check_backend(&RayonBackend, 3 * PAR_THRESHOLD + 5);
    }

    #[test]
    fn dotc_conjugates_first_argument() {
        let x = [Complex64::new(0.0, 1.0)];
        let y = [Complex64::new(0.0, 1.0)];
        // conj(i) * i = 1
        assert_eq!(SerialBackend.dotc(&x, &y), Complex64::new(1.0, 0.0));
        assert_eq!(RayonBackend.dotc(&x, &y), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn norm2_of_complex_vector() {
        let x = vec![Complex64::new(3.0, 4.0); 4 * PAR_THRESHOLD];
        let expected = 5.0 * ((4 * PAR_THRESHOLD) as f64).sqrt();
        assert_abs_diff_eq!(RayonBackend.norm2(&x), expected, epsilon = 1e-8);
    }
}
