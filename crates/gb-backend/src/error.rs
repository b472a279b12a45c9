use thiserror::Error;

use crate::backend::BufferId;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("invalid dimensions m={m}, n={n}, k={k}: all must be > 0 and m*n, m*k, k*n must fit in usize")]
    InvalidDims { m: usize, n: usize, k: usize },
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("allocation of {len} f32 elements failed: {reason}")]
    Alloc { len: usize, reason: String },
    #[error("unknown or released buffer {0}")]
    UnknownBuffer(BufferId),
    #[error("operands must be distinct buffers, got {0} twice")]
    AliasedBuffer(BufferId),
    #[error("{op} failed with status {status}")]
    Status { op: &'static str, status: i64 },
    #[error("backend '{0}' is not available in this build")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
