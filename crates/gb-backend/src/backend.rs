use std::fmt::{self, Debug};
use std::time::Duration;

use crate::dims::Dims;
use crate::error::Result;

/// Opaque handle to a buffer living in a backend's memory space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) usize);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which clock a backend uses to time a single SGEMM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Host wall clock around a blocking library call.
    Host,
    /// Device-side events recorded around the kernel.
    Device,
}

/// Trait for pluggable SGEMM backends (host BLAS, CUDA, etc.).
///
/// Operands live in the backend's own memory space and are addressed by
/// `BufferId`. For host backends that space is ordinary process memory;
/// for discrete accelerators it is device memory, and `upload` is the
/// host-to-device copy. Every `alloc` must be paired with exactly one
/// `free`.
pub trait GemmBackend: Send + Debug {
    /// Returns the name of this backend (e.g., "host", "cuda").
    fn name(&self) -> &str;

    /// Returns the clock used to time `sgemm`.
    fn clock(&self) -> Clock;

    /// Allocate a zero-filled buffer of `len` f32 elements.
    fn alloc(&mut self, len: usize) -> Result<BufferId>;

    /// Copy `src` into buffer `dst`. Lengths must match exactly.
    fn upload(&mut self, dst: BufferId, src: &[f32]) -> Result<()>;

    /// Copy buffer `src` back into `dst`. Lengths must match exactly.
    fn download(&mut self, src: BufferId, dst: &mut [f32]) -> Result<()>;

    /// Single-precision GEMM: C = alpha * A @ B + beta * C.
    ///
    /// - `a`: row-major buffer of shape [m, k]
    /// - `b`: row-major buffer of shape [k, n]
    /// - `c`: row-major buffer of shape [m, n], updated in place
    ///
    /// Blocks until the multiply has completed and returns the time this
    /// one call took.
    fn sgemm(
        &mut self,
        a: BufferId,
        b: BufferId,
        c: BufferId,
        dims: Dims,
        alpha: f32,
        beta: f32,
    ) -> Result<Duration>;

    /// Release a buffer. Releasing an unknown or already released buffer
    /// is an error.
    fn free(&mut self, id: BufferId) -> Result<()>;
}

macro_rules! forward_backend {
    ($ty:ty) => {
        impl<B: GemmBackend + ?Sized> GemmBackend for $ty {
            fn name(&self) -> &str {
                (**self).name()
            }

            fn clock(&self) -> Clock {
                (**self).clock()
            }

            fn alloc(&mut self, len: usize) -> Result<BufferId> {
                (**self).alloc(len)
            }

            fn upload(&mut self, dst: BufferId, src: &[f32]) -> Result<()> {
                (**self).upload(dst, src)
            }

            fn download(&mut self, src: BufferId, dst: &mut [f32]) -> Result<()> {
                (**self).download(src, dst)
            }

            fn sgemm(
                &mut self,
                a: BufferId,
                b: BufferId,
                c: BufferId,
                dims: Dims,
                alpha: f32,
                beta: f32,
            ) -> Result<Duration> {
                (**self).sgemm(a, b, c, dims, alpha, beta)
            }

            fn free(&mut self, id: BufferId) -> Result<()> {
                (**self).free(id)
            }
        }
    };
}

forward_backend!(Box<B>);
forward_backend!(&mut B);
