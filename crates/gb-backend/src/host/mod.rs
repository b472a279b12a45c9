use std::time::{Duration, Instant};

use tracing::trace;

use crate::backend::{BufferId, Clock, GemmBackend};
use crate::dims::Dims;
use crate::error::{BackendError, Result};
use crate::storage::{check_distinct, check_len, BufferTable};

/// Host BLAS backend built on `matrixmultiply::sgemm`.
///
/// Buffers are plain `Vec<f32>` in process memory, so `upload` and
/// `download` are memcpys. Each call is timed with the host monotonic
/// clock.
#[derive(Debug, Default)]
pub struct HostBackend {
    buffers: BufferTable<Vec<f32>>,
}

impl HostBackend {
    pub fn new() -> Self {
        HostBackend {
            buffers: BufferTable::new(),
        }
    }
}

impl GemmBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn clock(&self) -> Clock {
        Clock::Host
    }

    fn alloc(&mut self, len: usize) -> Result<BufferId> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| BackendError::Alloc {
            len,
            reason: e.to_string(),
        })?;
        buf.resize(len, 0.0f32);
        Ok(self.buffers.insert(buf))
    }

    fn upload(&mut self, dst: BufferId, src: &[f32]) -> Result<()> {
        let buf = self.buffers.get_mut(dst)?;
        check_len(buf.len(), src.len())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn download(&mut self, src: BufferId, dst: &mut [f32]) -> Result<()> {
        let buf = self.buffers.get(src)?;
        check_len(buf.len(), dst.len())?;
        dst.copy_from_slice(buf);
        Ok(())
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
        check_distinct(a, b, c)?;

        // C is written while A and B are read, so check it out of the table
        // for the duration of the call.
        let mut c_buf = self.buffers.remove(c)?;
        let result = self.run_kernel(a, b, &mut c_buf, dims, alpha, beta);
        self.buffers.restore(c, c_buf);
        result
    }

    fn free(&mut self, id: BufferId) -> Result<()> {
        self.buffers.remove(id).map(drop)
    }
}

impl HostBackend {
    fn run_kernel(
        &self,
        a: BufferId,
        b: BufferId,
        c: &mut [f32],
        dims: Dims,
        alpha: f32,
        beta: f32,
    ) -> Result<Duration> {
        let a = self.buffers.get(a)?;
        let b = self.buffers.get(b)?;
        check_len(dims.a_len(), a.len())?;
        check_len(dims.b_len(), b.len())?;
        check_len(dims.c_len(), c.len())?;

        let (m, n, k) = (dims.m(), dims.n(), dims.k());
        let start = Instant::now();
        // SAFETY: lengths were checked against dims above and all three
        // matrices are contiguous row-major, so every index the kernel
        // touches through these strides is in bounds. C does not alias A
        // or B because it was removed from the table.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                k as isize,
                1,
                b.as_ptr(),
                n as isize,
                1,
                beta,
                c.as_mut_ptr(),
                n as isize,
                1,
            );
        }
        let elapsed = start.elapsed();
        trace!(?elapsed, "host sgemm");
        Ok(elapsed)
    }
}
