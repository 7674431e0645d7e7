//! Convergence monitors.
//!
//! A monitor is built from the right-hand side `b` and decides, once per
//! iteration, whether the solver should stop by looking at the current
//! residual. The multi-shift driver only ever shows it the unshifted residual.

use crate::scalar::Scalar;

use super::backend::{RayonBackend, SolverBackend};

const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-5;
const DEFAULT_ITERATION_LIMIT: usize = 500;

/// Stopping policy consulted by the solver loop.
pub trait Monitor<T: Scalar> {
    /// Record the residual `r` and report whether iteration should stop.
    fn is_finished(&mut self, r: &[T]) -> bool;

    /// Advance the iteration counter.
    fn increment(&mut self);

    fn iteration_count(&self) -> usize;

    /// Norm of the residual last passed to `is_finished`.
    fn residual_norm(&self) -> f64;

    /// Whether the last residual met the tolerance.
    fn converged(&self) -> bool;
}

/// Tolerances and limits shared by the monitors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Stop once `||r|| <= relative_tolerance * ||b||` ...
    pub relative_tolerance: f64,
    /// ... or `||r|| <= absolute_tolerance`, whichever is larger.
    pub absolute_tolerance: f64,
    pub iteration_limit: usize,
    /// Log every iteration's residual.
    pub verbose: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            absolute_tolerance: 0.0,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            verbose: false,
        }
    }
}

impl MonitorConfig {
    /// Build the monitor this configuration describes.
    pub fn build<T: Scalar>(&self, b: &[T]) -> Box<dyn Monitor<T>> {
        let monitor = DefaultMonitor::new(
            b,
            self.relative_tolerance,
            self.iteration_limit,
            self.absolute_tolerance,
        );
        if self.verbose {
            return Box::new(VerboseMonitor::wrap(monitor));
        }
        Box::new(monitor)
    }
}

/// Relative-residual monitor with an iteration ceiling.
#[derive(Debug, Clone)]
pub struct DefaultMonitor {
    b_norm: f64,
    relative_tolerance: f64,
    absolute_tolerance: f64,
    iteration_limit: usize,
    iteration_count: usize,
    residual_norm: f64,
}

impl DefaultMonitor {
    pub fn new<T: Scalar>(
        b: &[T],
        relative_tolerance: f64,
        iteration_limit: usize,
        absolute_tolerance: f64,
    ) -> Self {
        Self {
            b_norm: RayonBackend.norm2(b),
            relative_tolerance,
            absolute_tolerance,
            iteration_limit,
            iteration_count: 0,
            residual_norm: f64::INFINITY,
        }
    }

    /// Monitor with the default tolerances: relative 1e-5, 500 iterations.
    pub fn from_rhs<T: Scalar>(b: &[T]) -> Self {
        Self::with_config(b, &MonitorConfig::default())
    }

    pub fn with_config<T: Scalar>(b: &[T], config: &MonitorConfig) -> Self {
        Self::new(
            b,
            config.relative_tolerance,
            config.iteration_limit,
            config.absolute_tolerance,
        )
    }

    /// Residual norm at or below which the solve counts as converged.
    pub fn tolerance(&self) -> f64 {
        self.absolute_tolerance
            .max(self.relative_tolerance * self.b_norm)
    }

    pub fn iteration_limit(&self) -> usize {
        self.iteration_limit
    }

    pub fn relative_tolerance(&self) -> f64 {
        self.relative_tolerance
    }

    pub fn absolute_tolerance(&self) -> f64 {
        self.absolute_tolerance
    }
}

impl<T: Scalar> Monitor<T> for DefaultMonitor {
    fn is_finished(&mut self, r: &[T]) -> bool {
        self.residual_norm = RayonBackend.norm2(r);
        Monitor::<T>::converged(self) || self.iteration_count >= self.iteration_limit
    }

    fn increment(&mut self) {
        self.iteration_count += 1;
    }

    fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    fn converged(&self) -> bool {
        self.residual_norm <= self.tolerance()
    }
}

/// A `DefaultMonitor` that logs its progress and keeps the residual history.
#[derive(Debug, Clone)]
pub struct VerboseMonitor {
    inner: DefaultMonitor,
    history: Vec<f64>,
    finished: bool,
}

impl VerboseMonitor {
    pub fn new<T: Scalar>(
        b: &[T],
        relative_tolerance: f64,
        iteration_limit: usize,
        absolute_tolerance: f64,
    ) -> Self {
        Self::wrap(DefaultMonitor::new(
            b,
            relative_tolerance,
            iteration_limit,
            absolute_tolerance,
        ))
    }

    pub fn wrap(inner: DefaultMonitor) -> Self {
        tracing::info!(
            tolerance = inner.tolerance(),
            iteration_limit = inner.iteration_limit(),
            "solver will continue until residual norm reaches tolerance or iteration limit"
        );
        Self {
            inner,
            history: Vec::new(),
            finished: false,
        }
    }

    /// Residual norms seen so far, one per `is_finished` call.
    pub fn residuals(&self) -> &[f64] {
        &self.history
    }
}

impl<T: Scalar> Monitor<T> for VerboseMonitor {
    fn is_finished(&mut self, r: &[T]) -> bool {
        let finished = Monitor::<T>::is_finished(&mut self.inner, r);
        let iteration = Monitor::<T>::iteration_count(&self.inner);
        let residual = Monitor::<T>::residual_norm(&self.inner);
        self.history.push(residual);
        tracing::debug!(iteration, residual, "monitor");

        if finished && !self.finished {
            self.finished = true;
            if Monitor::<T>::converged(&self.inner) {
                tracing::info!(iterations = iteration, residual, "successfully converged");
            } else {
                tracing::warn!(iterations = iteration, residual, "failed to converge");
            }
        }
        finished
    }

    fn increment(&mut self) {
        Monitor::<T>::increment(&mut self.inner);
    }

    fn iteration_count(&self) -> usize {
        Monitor::<T>::iteration_count(&self.inner)
    }

    fn residual_norm(&self) -> f64 {
        Monitor::<T>::residual_norm(&self.inner)
    }

    fn converged(&self) -> bool {
        Monitor::<T>::converged(&self.inner)
    }
}
