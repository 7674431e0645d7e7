//! End-to-end tests of the multi-shift CG solver.

use approx::assert_abs_diff_eq;
use multishift::output;
use multishift::parser;
use multishift::solver::backend::SerialBackend;
use multishift::solver::cg_m::{cg_m, solve_shifted};
use multishift::solver::shifted_residual;
use multishift::{
    solve, solve_with_monitor, CsrMatrix, DefaultMonitor, Monitor, MonitorConfig, VerboseMonitor,
};
use num_complex::Complex64;

/// Tridiagonal [-1, 2, -1] (SPD).
fn laplacian_1d(n: usize) -> CsrMatrix<f64> {
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, 2.0));
        if i > 0 {
            triplets.push((i, i - 1, -1.0));
        }
        if i + 1 < n {
            triplets.push((i, i + 1, -1.0));
        }
    }
    CsrMatrix::from_triplets(n, n, &triplets)
}

/// 2D five-point Laplacian on an m x m grid (SPD).
fn laplacian_2d(m: usize) -> CsrMatrix<f64> {
    let n = m * m;
    let mut triplets = Vec::new();
    for i in 0..m {
        for j in 0..m {
            let row = i * m + j;
            triplets.push((row, row, 4.0));
            if i > 0 {
                triplets.push((row, row - m, -1.0));
            }
            if i + 1 < m {
                triplets.push((row, row + m, -1.0));
            }
            if j > 0 {
                triplets.push((row, row - 1, -1.0));
            }
            if j + 1 < m {
                triplets.push((row, row + 1, -1.0));
            }
        }
    }
    CsrMatrix::from_triplets(n, n, &triplets)
}

fn rhs(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1.0 + (i as f64 * 0.7).cos()).collect()
}

/// Textbook CG from x = 0, stopping after `max_iter` iterations or when
/// ||r|| <= tol * ||b||. Returns (x, iterations).
fn reference_cg(a: &CsrMatrix<f64>, b: &[f64], tol: f64, max_iter: usize) -> (Vec<f64>, usize) {
    let n = b.len();
    let dot = |u: &[f64], v: &[f64]| u.iter().zip(v).map(|(x, y)| x * y).sum::<f64>();
    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut p = b.to_vec();
    let mut rs_old = dot(&r, &r);
    let b_norm = rs_old.sqrt();
    let mut iterations = 0;
    while rs_old.sqrt() > tol * b_norm && iterations < max_iter {
        let ap = a.spmv(&p);
        let step = rs_old / dot(&p, &ap);
        for i in 0..n {
            x[i] += step * p[i];
            r[i] -= step * ap[i];
        }
        let rs_new = dot(&r, &r);
        for i in 0..n {
            p[i] = r[i] + (rs_new / rs_old) * p[i];
        }
        rs_old = rs_new;
        iterations += 1;
    }
    (x, iterations)
}

#[test]
fn identity_scenario_two_shifts() {
    let a: CsrMatrix<f64> = CsrMatrix::identity(2);
    let b = [1.0, 1.0];
    let sigma = [0.0, 1.0];
    let mut x = vec![0.0; 4];
    let iterations = solve(&a, &mut x, &b, &sigma).expect("solve failed");
    assert!(iterations <= 2);
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(x[2], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(x[3], 0.5, epsilon = 1e-12);
}

#[test]
fn single_zero_shift_tracks_plain_cg_each_iteration() {
    let a = laplacian_1d(12);
    let b = rhs(12);
    for k in 1..=6 {
        let (expected, ref_iters) = reference_cg(&a, &b, 0.0, k);
        assert_eq!(ref_iters, k);

        let mut x = vec![0.0; 12];
        let mut monitor = DefaultMonitor::new(&b, 0.0, k, 0.0);
        let iterations = solve_with_monitor(&a, &mut x, &b, &[0.0], &mut monitor).unwrap();
        assert_eq!(iterations, k);
        for i in 0..12 {
            assert_abs_diff_eq!(x[i], expected[i], epsilon = 1e-10);
        }
    }
}

#[test]
fn every_shift_meets_residual_threshold() {
    let a = laplacian_2d(8);
    let n = a.nrows;
    let b = rhs(n);
    let sigma = [0.0, 1e-3, 0.1, 1.0, 10.0, 100.0];
    let tol = 1e-8;
    let config = MonitorConfig {
        relative_tolerance: tol,
        iteration_limit: 1000,
        ..MonitorConfig::default()
    };
    let solution = solve_shifted(&a, &b, &sigma, &config).unwrap();
    assert!(solution.converged);
    for (s, &shift) in sigma.iter().enumerate() {
        let res = shifted_residual(&a, shift, solution.block(s), &b);
        // Positive shifts converge at least as fast as the unshifted system.
        assert!(res < 10.0 * tol, "shift {shift}: relative residual {res}");
    }
}

#[test]
fn adding_shifts_does_not_perturb_existing_ones() {
    let a = laplacian_2d(6);
    let n = a.nrows;
    let b = rhs(n);

    let mut alone = vec![0.0; n];
    let mut m1 = DefaultMonitor::new(&b, 1e-10, 1000, 0.0);
    solve_with_monitor(&a, &mut alone, &b, &[0.3], &mut m1).unwrap();

    let mut together = vec![0.0; 3 * n];
    let mut m2 = DefaultMonitor::new(&b, 1e-10, 1000, 0.0);
    solve_with_monitor(&a, &mut together, &b, &[0.3, 5.0, 0.0], &mut m2).unwrap();

    assert_eq!(
        Monitor::<f64>::iteration_count(&m1),
        Monitor::<f64>::iteration_count(&m2)
    );
    for i in 0..n {
        assert_abs_diff_eq!(alone[i], together[i], epsilon = 1e-12);
    }
}

#[test]
fn zero_shifts_iterate_like_unshifted_cg() {
    let a = laplacian_2d(7);
    let n = a.nrows;
    let b = rhs(n);
    let tol = 1e-6;

    let (expected, ref_iters) = reference_cg(&a, &b, tol, 500);

    let mut x = vec![0.0; 3 * n];
    let mut monitor = DefaultMonitor::new(&b, tol, 500, 0.0);
    let iterations = solve_with_monitor(&a, &mut x, &b, &[0.0, 0.0, 0.0], &mut monitor).unwrap();
    assert_eq!(iterations, ref_iters);
    for block in x.chunks(n) {
        for i in 0..n {
            assert_abs_diff_eq!(block[i], expected[i], epsilon = 1e-8);
        }
    }
}

#[test]
fn serial_and_rayon_backends_agree() {
    let a = laplacian_1d(30);
    let b = rhs(30);
    let sigma = [0.0, 0.25, 2.0];

    let mut x_par = vec![0.0; 90];
    solve(&a, &mut x_par, &b, &sigma).unwrap();

    let mut x_ser = vec![0.0; 90];
    let mut monitor = DefaultMonitor::from_rhs(&b);
    cg_m(&SerialBackend, &a, &mut x_ser, &b, &sigma, &mut monitor).unwrap();

    for (p, s) in x_par.iter().zip(&x_ser) {
        assert_abs_diff_eq!(*p, *s, epsilon = 1e-12);
    }
}

#[test]
fn complex_shifts_on_real_spd_matrix() {
    let a = laplacian_1d(16).map(|v| Complex64::new(v, 0.0));
    let b: Vec<Complex64> = rhs(16).into_iter().map(|v| Complex64::new(v, 0.0)).collect();
    let sigma = [
        Complex64::new(0.0, 0.0),
        Complex64::new(0.5, 0.5),
        Complex64::new(0.0, 2.0),
    ];
    let mut x = vec![Complex64::new(0.0, 0.0); 48];
    let mut monitor = DefaultMonitor::new(&b, 1e-10, 500, 0.0);
    solve_with_monitor(&a, &mut x, &b, &sigma, &mut monitor).unwrap();
    assert!(Monitor::<Complex64>::converged(&monitor));

    for (s, &shift) in sigma.iter().enumerate() {
        let res = shifted_residual(&a, shift, &x[s * 16..(s + 1) * 16], &b);
        assert!(res < 1e-8, "shift {shift}: relative residual {res}");
    }
}

#[test]
fn verbose_monitor_sees_unshifted_residual_decrease() {
    let a = laplacian_1d(10);
    let b = rhs(10);
    let mut x = vec![0.0; 20];
    let mut monitor = VerboseMonitor::new(&b, 1e-8, 100, 0.0);
    let iterations = solve_with_monitor(&a, &mut x, &b, &[0.0, 1.0], &mut monitor).unwrap();
    let history = monitor.residuals();
    assert_eq!(history.len(), iterations + 1);
    assert!(history.last().unwrap() < &history[0]);
}

#[test]
fn dimension_mismatch_is_reported() {
    let a = laplacian_1d(4);
    let mut x = vec![0.0; 7];
    let err = solve(&a, &mut x, &[1.0; 4], &[0.0, 1.0]).unwrap_err();
    assert!(err.to_string().contains("Dimension error"), "got: {err}");
}

#[test]
fn matrix_market_to_csv_pipeline() {
    let matrix = "\
%%MatrixMarket matrix coordinate real symmetric
% 2x2 SPD
2 2 3
1 1 4
2 1 1
2 2 3
";
    let a = parser::parse_matrix_market(matrix).expect("parse failed");
    let b = parser::parse_vector("1\n2\n").expect("rhs parse failed");
    let sigma = [0.0, 1.0];
    let config = MonitorConfig {
        relative_tolerance: 1e-12,
        ..MonitorConfig::default()
    };
    let solution = solve_shifted(&a, &b, &sigma, &config).expect("solve failed");

    // [[4,1],[1,3]] x = [1,2]   => x = [1/11, 7/11]
    // [[5,1],[1,4]] x = [1,2]   => x = [2/19, 9/19]
    assert_abs_diff_eq!(solution.block(0)[0], 1.0 / 11.0, epsilon = 1e-10);
    assert_abs_diff_eq!(solution.block(0)[1], 7.0 / 11.0, epsilon = 1e-10);
    assert_abs_diff_eq!(solution.block(1)[0], 2.0 / 19.0, epsilon = 1e-10);
    assert_abs_diff_eq!(solution.block(1)[1], 9.0 / 19.0, epsilon = 1e-10);

    let mut out = Vec::new();
    output::write_solution_csv(&solution, &sigma, &mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Index,x(sigma=0),x(sigma=1)");
    assert!(lines[1].starts_with("0,"));
    assert!(lines[2].starts_with("1,"));
}
