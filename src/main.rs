use clap::Parser;
use multishift::output;
use multishift::parser;
use multishift::solver::cg_m::solve_shifted;
use multishift::solver::{shifted_residual, LinearOperator};
use multishift::stats::Stats;
use multishift::MonitorConfig;
use std::io;

/// Solve (A + σI) x = b for many shifts σ with multi-shift CG
#[derive(Parser)]
#[command(name = "multishift", version)]
struct Cli {
    /// Matrix Market coordinate file holding A (symmetric positive definite)
    matrix: String,

    /// Right-hand side file (defaults to all ones)
    #[arg(long)]
    rhs: Option<String>,

    /// Comma-separated list of shifts
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    shifts: Vec<f64>,

    /// Relative residual tolerance
    #[arg(long, default_value_t = 1e-5)]
    tol: f64,

    /// Absolute residual tolerance
    #[arg(long, default_value_t = 0.0)]
    abs_tol: f64,

    /// Iteration limit
    #[arg(long, default_value_t = 500)]
    max_iter: usize,

    /// Log the residual at every iteration
    #[arg(long)]
    verbose: bool,

    /// Print true relative residuals of every shifted system to stderr
    #[arg(long)]
    check: bool,

    /// Print performance stats to stderr
    #[arg(long)]
    stats: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut stats = if cli.stats { Some(Stats::new()) } else { None };

    let a = Stats::time(stats.as_mut(), "Read matrix", || {
        let input = std::fs::read_to_string(&cli.matrix).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {}", cli.matrix, e);
            std::process::exit(1);
        });
        parser::parse_matrix_market(&input).unwrap_or_else(|e| {
            eprintln!("Matrix error: {}", e);
            std::process::exit(1);
        })
    });

    let b = match &cli.rhs {
        Some(path) => {
            let input = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading {}: {}", path, e);
                std::process::exit(1);
            });
            parser::parse_vector(&input).unwrap_or_else(|e| {
                eprintln!("RHS error: {}", e);
                std::process::exit(1);
            })
        }
        None => vec![1.0; a.nrows()],
    };

    let config = MonitorConfig {
        relative_tolerance: cli.tol,
        absolute_tolerance: cli.abs_tol,
        iteration_limit: cli.max_iter,
        verbose: cli.verbose,
    };

    let solution = Stats::time(stats.as_mut(), "Solve", || {
        solve_shifted(&a, &b, &cli.shifts, &config).unwrap_or_else(|e| {
            eprintln!("Solve error: {}", e);
            std::process::exit(1);
        })
    });

    if !solution.converged {
        tracing::warn!(
            iterations = solution.iterations,
            residual = solution.residual_norm,
            "solver stopped before reaching the requested tolerance"
        );
    }

    let mut stdout = io::stdout();
    output::write_solution_csv(&solution, &cli.shifts, &mut stdout).unwrap_or_else(|e| {
        eprintln!("Output error: {}", e);
        std::process::exit(1);
    });

    if cli.check {
        let residuals: Vec<f64> = cli
            .shifts
            .iter()
            .enumerate()
            .map(|(s, &shift)| shifted_residual(&a, shift, solution.block(s), &b))
            .collect();
        output::write_residual_csv(&cli.shifts, &residuals, &mut io::stderr()).unwrap_or_else(
            |e| {
                eprintln!("Output error: {}", e);
                std::process::exit(1);
            },
        );
    }

    if let Some(ref mut stats) = stats {
        stats.unknowns = a.nrows();
        stats.nonzeros = a.nnz();
        stats.shifts = cli.shifts.len();
        stats.iterations = solution.iterations;
        stats.converged = solution.converged;
        stats.residual_norm = solution.residual_norm;
        stats.display();
    }
}
