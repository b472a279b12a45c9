//! `gb-backend` - SGEMM backends for gemm-bench.
//!
//! This crate provides:
//! - A `GemmBackend` trait: buffer lifecycle plus one timed SGEMM call
//! - A `HostBackend` built on `matrixmultiply`
//! - A `CudaBackend` built on cuBLAS (feature `cuda`)
//! - A `MockBackend` that tracks allocations, for tests
//! - The `Dims` problem-size triple

pub mod backend;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod dims;
pub mod error;
pub mod host;
pub mod mock;
pub mod storage;

// Re-export primary types at the crate root for convenience.
pub use backend::{BufferId, Clock, GemmBackend};
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use dims::Dims;
pub use error::{BackendError, Result};
pub use host::HostBackend;
pub use mock::MockBackend;
pub use storage::BufferTable;
