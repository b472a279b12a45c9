//! `gb-cli` - the `benchmark` command.
//!
//! ```bash
//! benchmark 1024 1024 64              # host BLAS, 100 trials
//! benchmark -b cuda --runs 10 512 512 512
//! ```
//!
//! Standard output is a single line, the best trial time in nanoseconds.
//! Everything else (usage, diagnostics, logs) goes to standard error.

pub mod logging;

use std::ffi::OsString;
use std::io::Write;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use gb_backend::{BackendError, Dims, GemmBackend, HostBackend};
use gb_runner::{BenchConfig, InitStrategy, DEFAULT_RUNS};
use tracing::info;

/// Exit status for a backend or runtime failure. Usage errors use clap's
/// status (2).
pub const EXIT_FAILURE: u8 = 1;

/// Measure the best-of-N latency of a single-precision GEMM (C += A @ B).
#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(version)]
pub struct Cli {
    /// Rows of A and C
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub m: u64,

    /// Columns of B and C
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub n: u64,

    /// Columns of A, rows of B
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub k: u64,

    /// Backend that runs the multiply
    #[arg(short, long, value_enum, default_value_t = BackendKind::Host)]
    pub backend: BackendKind,

    /// Number of timed trials
    #[arg(short, long, default_value_t = DEFAULT_RUNS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub runs: u64,

    /// Seed for the input generator (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// How input matrices are filled
    #[arg(long, value_enum, default_value_t = InitArg::Uniform)]
    pub init: InitArg,

    /// Device ordinal for accelerator backends
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Host BLAS (matrixmultiply)
    Host,
    /// NVIDIA cuBLAS (requires the `cuda` feature)
    Cuda,
    /// SYCL / oneMKL
    Sycl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitArg {
    /// Uniform over (-1, 1)
    Uniform,
    /// Legacy min/max ratio with random sign
    Ratio,
}

impl From<InitArg> for InitStrategy {
    fn from(arg: InitArg) -> Self {
        match arg {
            InitArg::Uniform => InitStrategy::Uniform,
            InitArg::Ratio => InitStrategy::Ratio,
        }
    }
}

impl Cli {
    /// Translate the parsed arguments into a run configuration.
    pub fn bench_config(&self) -> Result<BenchConfig> {
        let to_usize = |v: u64, what: &str| {
            usize::try_from(v).with_context(|| format!("{what}={v} does not fit in usize"))
        };
        let dims = Dims::new(
            to_usize(self.m, "m")?,
            to_usize(self.n, "n")?,
            to_usize(self.k, "k")?,
        )?;
        Ok(BenchConfig::new(dims)
            .with_runs(to_usize(self.runs, "runs")?)
            .with_init(self.init.into())
            .with_seed(self.seed))
    }
}

/// Create the backend selected on the command line.
pub fn open_backend(cli: &Cli) -> Result<Box<dyn GemmBackend>> {
    match cli.backend {
        BackendKind::Host => Ok(Box::new(HostBackend::new())),
        BackendKind::Cuda => open_cuda(cli.device),
        // No oneMKL binding is linked into this build.
        BackendKind::Sycl => Err(BackendError::Unavailable("sycl".to_string()).into()),
    }
}

#[cfg(feature = "cuda")]
fn open_cuda(device: usize) -> Result<Box<dyn GemmBackend>> {
    let backend = gb_backend::CudaBackend::new(device)
        .with_context(|| format!("failed to open CUDA device {device}"))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "cuda"))]
fn open_cuda(_device: usize) -> Result<Box<dyn GemmBackend>> {
    Err(BackendError::Unavailable("cuda".to_string()).into())
}

/// Run the benchmark on `backend` and write the report line to `out`.
///
/// The backend is dropped, releasing its handle, before this returns.
pub fn execute<B: GemmBackend>(cli: &Cli, mut backend: B, out: &mut dyn Write) -> Result<()> {
    let config = cli.bench_config()?;
    let mut rng = config.rng();
    let measurement = gb_runner::run(&config, &mut backend, &mut rng)
        .with_context(|| format!("{} benchmark failed for {}", backend.name(), config.dims))?;
    drop(backend);

    gb_runner::write_report(out, &measurement).context("failed to write report")?;
    out.flush().context("failed to flush report")?;
    info!(best_ns = measurement.best_nanos(), "reported");
    Ok(())
}

/// Write an error and its causes to `err` and return the failure status.
pub fn report_error(error: &anyhow::Error, err: &mut dyn Write) -> u8 {
    let _ = writeln!(err, "[ERROR] {error}");
    for cause in error.chain().skip(1) {
        let _ = writeln!(err, "  caused by: {cause}");
    }
    EXIT_FAILURE
}

/// Parse `args`, open a backend with `open`, run, and return the process
/// exit status.
///
/// Usage errors are written to `err` and return clap's status before
/// `open` is called, so nothing is allocated. `--help` and `--version` go
/// to `out` with status 0.
pub fn run_from_args<I, T, B, F>(args: I, open: F, out: &mut dyn Write, err: &mut dyn Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    B: GemmBackend,
    F: FnOnce(&Cli) -> Result<B>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let rendered = e.render();
            let _ = if e.use_stderr() {
                write!(err, "{rendered}")
            } else {
                write!(out, "{rendered}")
            };
            return u8::try_from(e.exit_code()).unwrap_or(EXIT_FAILURE);
        }
    };

    match open(&cli).and_then(|backend| execute(&cli, backend, out)) {
        Ok(()) => 0,
        Err(e) => report_error(&e, err),
    }
}
