// CUDA / cuBLAS backend (NVIDIA only).
//
// Device memory, host-to-device copies and the cuBLAS handle come from
// cudarc. Each call is bracketed by a pair of CUDA events on the backend's
// stream and timed on the device.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cudarc::cublas::result::CublasError;
use cudarc::cublas::sys::cublasOperation_t;
use cudarc::cublas::{CudaBlas, Gemm, GemmConfig};
use cudarc::driver::sys::CUevent_flags;
use cudarc::driver::{CudaContext, CudaEvent, CudaSlice, CudaStream, DriverError};
use tracing::{debug, trace, warn};

use crate::backend::{BufferId, Clock, GemmBackend};
use crate::dims::Dims;
use crate::error::{BackendError, Result};
use crate::storage::{check_distinct, check_len, BufferTable};

fn driver_err(op: &'static str) -> impl FnOnce(DriverError) -> BackendError {
    move |e| BackendError::Status {
        op,
        status: e.0 as i64,
    }
}

fn cublas_err(op: &'static str) -> impl FnOnce(CublasError) -> BackendError {
    move |e| BackendError::Status {
        op,
        status: e.0 as i64,
    }
}

fn to_i32(dims: Dims, v: usize) -> Result<i32> {
    i32::try_from(v).map_err(|_| BackendError::InvalidDims {
        m: dims.m(),
        n: dims.n(),
        k: dims.k(),
    })
}

/// cuBLAS SGEMM on one CUDA device.
pub struct CudaBackend {
    ordinal: usize,
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    blas: CudaBlas,
    start: CudaEvent,
    end: CudaEvent,
    buffers: BufferTable<CudaSlice<f32>>,
}

impl CudaBackend {
    /// Create a context, stream, cuBLAS handle and timing events on the
    /// device with the given ordinal.
    pub fn new(ordinal: usize) -> Result<Self> {
        debug!(ordinal, "initializing CUDA backend");
        let ctx = CudaContext::new(ordinal).map_err(driver_err("cuCtxCreate"))?;
        let stream = ctx.default_stream();
        let blas = CudaBlas::new(stream.clone()).map_err(cublas_err("cublasCreate"))?;
        // Timing must stay enabled on these events; cudarc disables it by
        // default.
        let start = ctx
            .new_event(Some(CUevent_flags::CU_EVENT_DEFAULT))
            .map_err(driver_err("cuEventCreate"))?;
        let end = ctx
            .new_event(Some(CUevent_flags::CU_EVENT_DEFAULT))
            .map_err(driver_err("cuEventCreate"))?;

        Ok(CudaBackend {
            ordinal,
            _ctx: ctx,
            stream,
            blas,
            start,
            end,
            buffers: BufferTable::new(),
        })
    }

    fn run_kernel(
        &self,
        a: BufferId,
        b: BufferId,
        c: &mut CudaSlice<f32>,
        dims: Dims,
        alpha: f32,
        beta: f32,
    ) -> Result<Duration> {
        let a = self.buffers.get(a)?;
        let b = self.buffers.get(b)?;
        check_len(dims.a_len(), a.len())?;
        check_len(dims.b_len(), b.len())?;
        check_len(dims.c_len(), c.len())?;

        // cuBLAS is column-major. A row-major C = A @ B is the column-major
        // C^T = B^T @ A^T, with B's buffer as the left operand.
        let m = to_i32(dims, dims.m())?;
        let n = to_i32(dims, dims.n())?;
        let k = to_i32(dims, dims.k())?;
        let cfg = GemmConfig {
            transa: cublasOperation_t::CUBLAS_OP_N,
            transb: cublasOperation_t::CUBLAS_OP_N,
            m: n,
            n: m,
            k,
            alpha,
            lda: n,
            ldb: k,
            beta,
            ldc: n,
        };

        self.start
            .record(&self.stream)
            .map_err(driver_err("cuEventRecord"))?;
        // SAFETY: operand lengths match the problem size and leading
        // dimensions checked above; C was removed from the table so it does
        // not alias A or B.
        unsafe { self.blas.gemm(cfg, b, a, c) }.map_err(cublas_err("cublasSgemm"))?;
        self.end
            .record(&self.stream)
            .map_err(driver_err("cuEventRecord"))?;
        self.end
            .synchronize()
            .map_err(driver_err("cuEventSynchronize"))?;
        let ms = self
            .start
            .elapsed_ms(&self.end)
            .map_err(driver_err("cuEventElapsedTime"))?;

        let elapsed = Duration::from_secs_f64(f64::from(ms.max(0.0)) / 1e3);
        trace!(?elapsed, "cuda sgemm");
        Ok(elapsed)
    }
}

impl fmt::Debug for CudaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaBackend")
            .field("ordinal", &self.ordinal)
            .field("live_buffers", &self.buffers.live())
            .finish()
    }
}

impl GemmBackend for CudaBackend {
    fn name(&self) -> &str {
        "cuda"
    }

    fn clock(&self) -> Clock {
        Clock::Device
    }

    fn alloc(&mut self, len: usize) -> Result<BufferId> {
        let buf = self
            .stream
            .alloc_zeros::<f32>(len)
            .map_err(driver_err("cuMemAlloc"))?;
        Ok(self.buffers.insert(buf))
    }

    fn upload(&mut self, dst: BufferId, src: &[f32]) -> Result<()> {
        let stream = self.stream.clone();
        let buf = self.buffers.get_mut(dst)?;
        check_len(buf.len(), src.len())?;
        stream
            .memcpy_htod(src, buf)
            .map_err(driver_err("cuMemcpyHtoD"))?;
        stream.synchronize().map_err(driver_err("cuStreamSynchronize"))
    }

    fn download(&mut self, src: BufferId, dst: &mut [f32]) -> Result<()> {
        let buf = self.buffers.get(src)?;
        check_len(buf.len(), dst.len())?;
        self.stream
            .memcpy_dtoh(buf, dst)
            .map_err(driver_err("cuMemcpyDtoH"))?;
        self.stream
            .synchronize()
            .map_err(driver_err("cuStreamSynchronize"))
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
        let mut c_buf = self.buffers.remove(c)?;
        let result = self.run_kernel(a, b, &mut c_buf, dims, alpha, beta);
        self.buffers.restore(c, c_buf);
        result
    }

    fn free(&mut self, id: BufferId) -> Result<()> {
        // Dropping the slice releases the device allocation.
        self.buffers.remove(id).map(drop)
    }
}

impl Drop for CudaBackend {
    fn drop(&mut self) {
        let live = self.buffers.live();
        if live > 0 {
            warn!(live, "CUDA backend dropped with live device buffers");
        }
    }
}
