//! Performance statistics collection for `--stats` output.

use std::time::{Duration, Instant};

/// Collects phase timings and solver counters.
///
/// Created when `--stats` is passed, threaded as `Option<&mut Stats>`.
pub struct Stats {
    total_start: Instant,
    phases: Vec<(&'static str, Duration)>,
    pub unknowns: usize,
    pub nonzeros: usize,
    pub shifts: usize,
    pub iterations: usize,
    pub converged: bool,
    pub residual_norm: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            phases: Vec::new(),
            unknowns: 0,
            nonzeros: 0,
            shifts: 0,
            iterations: 0,
            converged: false,
            residual_norm: 0.0,
        }
    }

    /// Record a completed phase with its duration.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        self.phases.push((name, duration));
    }

    /// Time `f` and record it as phase `name`.
    pub fn time<R>(stats: Option<&mut Self>, name: &'static str, f: impl FnOnce() -> R) -> R {
        match stats {
            Some(s) => {
                let start = Instant::now();
                let out = f();
                s.add_phase(name, start.elapsed());
                out
            }
            None => f(),
        }
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    /// Matrix-vector products per second of solve time; one per iteration.
    pub fn matvec_rate(&self) -> Option<f64> {
        let (_, solve) = self.phases.iter().find(|(name, _)| *name == "Solve")?;
        let secs = solve.as_secs_f64();
        (secs > 0.0).then(|| self.iterations as f64 / secs)
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        let total = self.total_start.elapsed();
        eprintln!();
        eprintln!("=== Multishift Performance Stats ===");

        for (name, dur) in &self.phases {
            eprintln!("  {:<24} {:>8.3}s", name, dur.as_secs_f64());
        }

        eprintln!("  Unknowns:               {}", self.unknowns);
        eprintln!("  Non-zeros:              {}", self.nonzeros);
        eprintln!("  Shifts:                 {}", self.shifts);
        eprintln!("  CG-M iterations:        {}", self.iterations);
        eprintln!(
            "  Converged:              {} (residual {:e})",
            self.converged, self.residual_norm
        );
        if let Some(rate) = self.matvec_rate() {
            eprintln!("  Matvecs/s:              {:.1}", rate);
        }

        eprintln!("  ─────────────────────────────────");
        eprintln!("  Total:                  {:>8.3}s", total.as_secs_f64());
    }
}
