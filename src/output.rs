//! Results output formatting (CSV).

use crate::error::Result;
use crate::solver::cg_m::ShiftedSolution;
use std::io::Write;

/// Write every shifted solution as CSV, one column per shift.
///
/// Format:
/// ```csv
/// Index,x(sigma=0),x(sigma=0.5)
/// 0,1.0,0.667
/// 1,1.0,0.667
/// ```
pub fn write_solution_csv<W: Write>(
    solution: &ShiftedSolution<f64>,
    sigma: &[f64],
    writer: &mut W,
) -> Result<()> {
    write!(writer, "Index")?;
    for shift in sigma {
        write!(writer, ",x(sigma={})", shift)?;
    }
    writeln!(writer)?;

    for k in 0..solution.layout.block_len() {
        write!(writer, "{}", k)?;
        for s in 0..solution.layout.n_blocks() {
            write!(writer, ",{}", solution.values[solution.layout.index(s, k)])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write per-shift relative residuals as CSV.
///
/// Format:
/// ```csv
/// Shift,RelativeResidual
/// 0,3.1e-7
/// ```
pub fn write_residual_csv<W: Write>(
    sigma: &[f64],
    residuals: &[f64],
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "Shift,RelativeResidual")?;
    for (shift, residual) in sigma.iter().zip(residuals) {
        writeln!(writer, "{},{:e}", shift, residual)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::layout::StackedLayout;

    #[test]
    fn solution_csv_has_one_column_per_shift() {
        let solution = ShiftedSolution {
            layout: StackedLayout::new(2, 2),
            values: vec![1.0, 1.0, 0.5, 0.25],
            iterations: 1,
            converged: true,
            residual_norm: 0.0,
        };
        let mut out = Vec::new();
        write_solution_csv(&solution, &[0.0, 1.0], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Index,x(sigma=0),x(sigma=1)\n0,1,0.5\n1,1,0.25\n");
    }

    #[test]
    fn residual_csv() {
        let mut out = Vec::new();
        write_residual_csv(&[0.5], &[0.001], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Shift,RelativeResidual\n0.5,1e-3\n");
    }
}
