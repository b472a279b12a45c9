use std::io::{self, Write};
use std::time::Duration;

use gb_backend::{Clock, Dims, GemmBackend};
use rand::Rng;
use tracing::info;

use crate::config::BenchConfig;
use crate::error::{Result, RunError};
use crate::init::random_matrix;
use crate::session::Session;
use crate::trials::run_trials;

/// Outcome of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub dims: Dims,
    pub backend: String,
    pub clock: Clock,
    pub runs: usize,
    /// Fastest trial.
    pub best: Duration,
}

impl Measurement {
    /// Fastest trial in nanoseconds, the unit every backend reports in.
    pub fn best_nanos(&self) -> f64 {
        self.best.as_nanos() as f64
    }

    /// Throughput of the fastest trial in GFLOP/s, or `None` if it took no
    /// measurable time.
    pub fn gflops(&self) -> Option<f64> {
        let ns = self.best_nanos();
        (ns > 0.0).then(|| self.dims.flops() / ns)
    }
}

/// Run the timed-trial protocol on `backend`.
///
/// Fills A, B and C from `rng`, moves them into the backend once, times
/// `config.runs` SGEMM calls on the same buffers and keeps the fastest.
/// Backend buffers are released before returning, on success and on error.
pub fn run<B, R>(config: &BenchConfig, backend: &mut B, rng: &mut R) -> Result<Measurement>
where
    B: GemmBackend + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;
    let dims = config.dims;
    let name = backend.name().to_string();
    let clock = backend.clock();
    info!(backend = %name, ?clock, %dims, runs = config.runs, "starting sgemm benchmark");

    let mut session = {
        let a = random_matrix(rng, dims.a_len(), config.init)?;
        let b = random_matrix(rng, dims.b_len(), config.init)?;
        let c = random_matrix(rng, dims.c_len(), config.init)?;
        // Host copies are released once the backend holds its own.
        Session::open(backend, dims, &a, &b, &c)?
    };
    let min = run_trials(config.runs, |_| session.sgemm(config.alpha, config.beta))?;
    session.close()?;

    let best = min
        .best()
        .ok_or_else(|| RunError::InvalidConfig("no trials were run".to_string()))?;
    let measurement = Measurement {
        dims,
        backend: name,
        clock,
        runs: min.count(),
        best,
    };
    info!(
        best_ns = measurement.best_nanos(),
        gflops = measurement.gflops().unwrap_or(f64::NAN),
        flop_per_byte = dims.flops() / dims.naive_bytes(),
        "benchmark complete"
    );
    Ok(measurement)
}

/// Write the single report line: best time in nanoseconds, six decimals.
pub fn write_report<W: Write + ?Sized>(out: &mut W, measurement: &Measurement) -> io::Result<()> {
    writeln!(out, "{:.6}", measurement.best_nanos())
}
