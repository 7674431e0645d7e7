//! Scalar types the solver runs on.
//!
//! Real (`f64`) and complex (`Complex64`) systems share one implementation;
//! the only place they differ is the conjugation in inner products.

use num_complex::Complex64;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Trait bounds needed for solver arithmetic.
pub trait Scalar:
    Copy
    + Default
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + PartialEq
    + std::fmt::Debug
    + std::fmt::Display
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    /// Complex conjugate; identity for real types.
    fn conj(self) -> Self;
    /// Absolute value (real) or modulus (complex).
    fn modulus(self) -> f64;
    fn is_finite(self) -> bool;
}

impl Scalar for f64 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn conj(self) -> Self {
        self
    }
    fn modulus(self) -> f64 {
        self.abs()
    }
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }
    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }
    fn modulus(self) -> f64 {
        self.norm()
    }
    fn is_finite(self) -> bool {
        Complex64::is_finite(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn real_conj_is_identity() {
        assert_eq!(Scalar::conj(-2.5_f64), -2.5);
        assert_abs_diff_eq!((-2.5_f64).modulus(), 2.5);
    }

    #[test]
    fn complex_conj_flips_imaginary_part() {
        let z = Complex64::new(3.0, 4.0);
        assert_eq!(Scalar::conj(z), Complex64::new(3.0, -4.0));
        assert_abs_diff_eq!(z.modulus(), 5.0, epsilon = 1e-15);
    }

    #[test]
    fn non_finite_detection() {
        assert!(!Scalar::is_finite(f64::NAN));
        assert!(!Scalar::is_finite(Complex64::new(1.0, f64::INFINITY)));
        assert!(Scalar::is_finite(<Complex64 as Scalar>::one()));
    }
}
