//! `gb-runner` - The timed-trial SGEMM benchmarking protocol.
//!
//! One run generates random inputs from a caller-supplied RNG, moves them
//! into the backend once, times a fixed number of SGEMM calls on the same
//! buffers, keeps only the fastest, and releases every backend buffer on
//! the way out.

pub mod bench;
pub mod config;
pub mod error;
pub mod init;
pub mod session;
pub mod trials;

pub use bench::{run, write_report, Measurement};
pub use config::BenchConfig;
pub use error::{Result, RunError};
pub use init::{random_matrix, InitStrategy};
pub use session::Session;
pub use trials::{run_trials, MinTime, DEFAULT_RUNS};
