//! Multi-shift conjugate gradient (CG-M).
//!
//! Solves `(A + σI) x = b` for every shift `σ` in one pass, written against
//! the `SolverBackend` trait so the same loop runs on any backend.
//!
//! Only the unshifted CG sequence (r, p, β, α) touches the operator. Each
//! shifted system follows from it through the per-shift ζ, β, α recurrences
//! of Jegerlehner (hep-lat/9612014), so the cost of a new shift is a few
//! vector updates per iteration rather than a matrix-vector product.
//!
//! Limitations inherited from the method:
//! - convergence is judged on the unshifted residual only;
//! - no preconditioning;
//! - a vanishing `(p, Ap)` breaks the recurrence. The resulting Inf/NaN is
//!   left to propagate (and logged once) rather than masked.

use crate::error::{MultishiftError, Result};
use crate::scalar::Scalar;

use super::backend::{RayonBackend, SolverBackend};
use super::layout::StackedLayout;
use super::monitor::{DefaultMonitor, Monitor, MonitorConfig};
use super::shift_kernels::{
    broadcast_replicate, compute_next_alpha_sigma, compute_next_beta_sigma, compute_next_zeta,
    update_shifted_solution_and_direction,
};
use super::LinearOperator;

/// Scalars of the unshifted CG recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CgScalars<T> {
    /// β of the previous iteration.
    pub beta_prev: T,
    /// Negated step length, `-(r, r) / (p, Ap)`.
    pub beta: T,
    /// Direction mixing coefficient, `(r', r') / (r, r)`.
    pub alpha: T,
    pub rsq_prev: T,
    pub rsq: T,
}

impl<T: Scalar> CgScalars<T> {
    /// Bootstrap values: β = 1, α = 0.
    pub fn start(rsq: T) -> Self {
        Self {
            beta_prev: T::one(),
            beta: T::one(),
            alpha: T::zero(),
            rsq_prev: rsq,
            rsq,
        }
    }
}

/// Per-shift parameters, one entry per shift.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftParams<T> {
    /// ζ₋₁
    pub zeta_prev: Vec<T>,
    /// ζ₀
    pub zeta: Vec<T>,
    /// ζ₁
    pub zeta_next: Vec<T>,
    /// β₀σ
    pub beta: Vec<T>,
    /// α₀σ
    pub alpha: Vec<T>,
}

impl<T: Scalar> ShiftParams<T> {
    /// Bootstrap values: ζ₋₁ = ζ₀ = 1, α₀σ = 0.
    pub fn new(n_shifts: usize) -> Self {
        Self {
            zeta_prev: vec![T::one(); n_shifts],
            zeta: vec![T::one(); n_shifts],
            zeta_next: vec![T::zero(); n_shifts],
            beta: vec![T::zero(); n_shifts],
            alpha: vec![T::zero(); n_shifts],
        }
    }

    /// ζ₋₁ ← ζ₀, ζ₀ ← ζ₁. `zeta_next` is left holding stale values.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.zeta_prev, &mut self.zeta);
        std::mem::swap(&mut self.zeta, &mut self.zeta_next);
    }
}

/// Solutions of every shifted system, stacked shift-major.
#[derive(Debug, Clone)]
pub struct ShiftedSolution<T> {
    pub layout: StackedLayout,
    pub values: Vec<T>,
    pub iterations: usize,
    pub converged: bool,
    /// Final unshifted residual norm seen by the monitor.
    pub residual_norm: f64,
}

impl<T> ShiftedSolution<T> {
    /// Solution of the system for shift index `s`.
    pub fn block(&self, s: usize) -> &[T] {
        &self.values[self.layout.block_range(s)]
    }
}

/// Solve every shifted system with the default monitor built from `b`.
///
/// `x` holds one block of `A.nrows()` values per shift and is overwritten.
/// Returns the iteration count.
pub fn solve<T, A>(a: &A, x: &mut [T], b: &[T], sigma: &[T]) -> Result<usize>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
{
    let mut monitor = DefaultMonitor::from_rhs(b);
    solve_with_monitor(a, x, b, sigma, &mut monitor)
}

/// Solve every shifted system, stopping when `monitor` says so.
pub fn solve_with_monitor<T, A, M>(
    a: &A,
    x: &mut [T],
    b: &[T],
    sigma: &[T],
    monitor: &mut M,
) -> Result<usize>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
    M: Monitor<T> + ?Sized,
{
    cg_m(&RayonBackend, a, x, b, sigma, monitor)
}

/// Allocate the stacked solution, solve, and collect the outcome.
pub fn solve_shifted<T, A>(
    a: &A,
    b: &[T],
    sigma: &[T],
    config: &MonitorConfig,
) -> Result<ShiftedSolution<T>>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
{
    let layout = StackedLayout::new(a.nrows(), sigma.len());
    let mut values = vec![T::zero(); layout.total_len()];
    let mut monitor = config.build(b);
    let iterations = solve_with_monitor(a, &mut values, b, sigma, monitor.as_mut())?;
    Ok(ShiftedSolution {
        layout,
        values,
        iterations,
        converged: monitor.converged(),
        residual_norm: monitor.residual_norm(),
    })
}

/// Multi-shift CG on an arbitrary backend.
///
/// On success `x_sigma` holds the solution for shift `s` in block `s` and
/// the monitor's iteration count is returned.
pub fn cg_m<T, B, A, M>(
    backend: &B,
    a: &A,
    x_sigma: &mut [T],
    b: &[T],
    sigma: &[T],
    monitor: &mut M,
) -> Result<usize>
where
    T: Scalar,
    B: SolverBackend<T>,
    A: LinearOperator<T> + ?Sized,
    M: Monitor<T> + ?Sized,
{
    let n = a.nrows();
    let n_shifts = sigma.len();
    if a.ncols() != n || b.len() != n {
        return Err(MultishiftError::Dimension(format!(
            "matrix is {}x{}, rhs length is {}",
            n,
            a.ncols(),
            b.len()
        )));
    }
    let layout = StackedLayout::new(n, n_shifts);
    layout.check("x_sigma", x_sigma.len())?;
    if n == 0 {
        return Ok(0);
    }

    let _span = tracing::info_span!("cg_m", n, n_shifts).entered();

    // Scratch buffers
    let mut r = vec![T::zero(); n];
    let mut p = vec![T::zero(); n];
    let mut ap = vec![T::zero(); n];
    let mut p_sigma = vec![T::zero(); layout.total_len()];
    let mut shifts = ShiftParams::new(n_shifts);

    // x starts at 0, so r = b and every search direction starts at b
    backend.copy(b, &mut r);
    let mut cg = CgScalars::start(backend.dotc(&r, &r));
    backend.fill(x_sigma, T::zero());
    broadcast_replicate(b, &mut p_sigma)?;
    backend.copy(b, &mut p);

    let mut breakdown_logged = false;

    while !monitor.is_finished(&r) {
        cg.rsq_prev = cg.rsq;
        cg.beta_prev = cg.beta;

        a.apply(&p, &mut ap);
        let pap = backend.dotc(&p, &ap);
        cg.beta = -cg.rsq_prev / pap;
        if !cg.beta.is_finite() && !breakdown_logged {
            breakdown_logged = true;
            tracing::warn!(
                iteration = monitor.iteration_count(),
                pap = %pap,
                "CG-M breakdown: (p, Ap) ~ 0, step length is not finite"
            );
        }

        // r = r + beta * Ap
        backend.axpy(cg.beta, &ap, &mut r);

        compute_next_zeta(
            &shifts.zeta,
            &shifts.zeta_prev,
            sigma,
            &mut shifts.zeta_next,
            cg.beta_prev,
            cg.beta,
            cg.alpha,
        )?;
        compute_next_beta_sigma(&shifts.zeta_next, &shifts.zeta, &mut shifts.beta, cg.beta)?;

        cg.rsq = backend.dotc(&r, &r);
        cg.alpha = cg.rsq / cg.rsq_prev;
        let alpha_inv = cg.rsq_prev / cg.rsq;

        // p = alpha * (p + r / alpha) = r + alpha * p
        backend.axpy(alpha_inv, &r, &mut p);
        backend.scale(cg.alpha, &mut p);

        compute_next_alpha_sigma(
            &shifts.zeta,
            &shifts.zeta_next,
            &shifts.beta,
            &mut shifts.alpha,
            cg.beta,
            cg.alpha,
        )?;
        update_shifted_solution_and_direction(
            &shifts.alpha,
            &shifts.zeta_next,
            &shifts.beta,
            &r,
            x_sigma,
            &mut p_sigma,
        )?;

        shifts.rotate();
        monitor.increment();
    }

    let iterations = monitor.iteration_count();
    if monitor.converged() {
        tracing::info!(iterations, residual = monitor.residual_norm(), "CG-M converged");
    } else {
        tracing::debug!(iterations, residual = monitor.residual_norm(), "CG-M stopped before converging");
    }
    Ok(iterations)
}
