//! Multi-shift conjugate gradient.
//!
//! Solves `(A + σI) x = b` for many shifts `σ` at once from a single
//! unshifted CG Krylov sequence: one matrix-vector product per iteration
//! serves every shift.

pub mod error;
pub mod output;
pub mod parser;
pub mod scalar;
pub mod solver;
pub mod sparse;
pub mod stats;

pub use error::{MultishiftError, Result};
pub use scalar::Scalar;
pub use solver::cg_m::{solve, solve_with_monitor};
pub use solver::monitor::{DefaultMonitor, Monitor, MonitorConfig, VerboseMonitor};
pub use sparse::CsrMatrix;
