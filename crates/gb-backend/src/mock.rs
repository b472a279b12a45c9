//! Allocation-tracking backend for tests.
//!
//! `MockBackend` never touches real memory or runs a kernel. It records
//! every buffer it hands out, counts kernel invocations, reports a scripted
//! elapsed time per call, and can be told to fail a specific allocation or
//! kernel call.

use std::time::Duration;

use crate::backend::{BufferId, Clock, GemmBackend};
use crate::dims::Dims;
use crate::error::{BackendError, Result};
use crate::storage::{check_distinct, check_len, BufferTable};

/// Status code reported for scripted allocation failures
/// (`cudaErrorMemoryAllocation`).
pub const MOCK_ALLOC_STATUS: i64 = 2;

/// Status code reported for scripted kernel failures
/// (`CUBLAS_STATUS_EXECUTION_FAILED`).
pub const MOCK_KERNEL_STATUS: i64 = 13;

#[derive(Debug)]
pub struct MockBackend {
    samples: Vec<Duration>,
    fail_alloc_on: Option<usize>,
    fail_sgemm_on: Option<usize>,
    buffers: BufferTable<usize>,
    alloc_calls: usize,
    upload_calls: usize,
    sgemm_calls: usize,
    frees: usize,
    bad_frees: usize,
}

impl MockBackend {
    /// A mock whose every kernel call reports `elapsed`.
    pub fn new(elapsed: Duration) -> Self {
        Self::with_samples(vec![elapsed])
    }

    /// A mock that reports `samples` in order, cycling when exhausted.
    ///
    /// # Panics
    /// Panics if `samples` is empty.
    pub fn with_samples(samples: Vec<Duration>) -> Self {
        assert!(!samples.is_empty(), "mock needs at least one sample");
        MockBackend {
            samples,
            fail_alloc_on: None,
            fail_sgemm_on: None,
            buffers: BufferTable::new(),
            alloc_calls: 0,
            upload_calls: 0,
            sgemm_calls: 0,
            frees: 0,
            bad_frees: 0,
        }
    }

    /// Make the `nth` call to `alloc` (1-based) fail.
    pub fn fail_alloc_on(mut self, nth: usize) -> Self {
        self.fail_alloc_on = Some(nth);
        self
    }

    /// Make the `nth` call to `sgemm` (1-based) fail.
    pub fn fail_sgemm_on(mut self, nth: usize) -> Self {
        self.fail_sgemm_on = Some(nth);
        self
    }

    /// Number of `alloc` calls, including failed ones.
    pub fn alloc_calls(&self) -> usize {
        self.alloc_calls
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls
    }

    /// Number of `sgemm` calls, including failed ones.
    pub fn sgemm_calls(&self) -> usize {
        self.sgemm_calls
    }

    /// Number of successful `free` calls.
    pub fn frees(&self) -> usize {
        self.frees
    }

    /// Number of `free` calls on an unknown or already released handle.
    pub fn bad_frees(&self) -> usize {
        self.bad_frees
    }

    /// Buffers allocated and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.buffers.live()
    }
}

impl GemmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn clock(&self) -> Clock {
        Clock::Device
    }

    fn alloc(&mut self, len: usize) -> Result<BufferId> {
        self.alloc_calls += 1;
        if self.fail_alloc_on == Some(self.alloc_calls) {
            return Err(BackendError::Status {
                op: "mock alloc",
                status: MOCK_ALLOC_STATUS,
            });
        }
        Ok(self.buffers.insert(len))
    }

    fn upload(&mut self, dst: BufferId, src: &[f32]) -> Result<()> {
        self.upload_calls += 1;
        check_len(*self.buffers.get(dst)?, src.len())
    }

    fn download(&mut self, src: BufferId, dst: &mut [f32]) -> Result<()> {
        check_len(*self.buffers.get(src)?, dst.len())?;
        dst.fill(0.0);
        Ok(())
    }

    fn sgemm(
        &mut self,
        a: BufferId,
        b: BufferId,
        c: BufferId,
        dims: Dims,
        _alpha: f32,
        _beta: f32,
    ) -> Result<Duration> {
        self.sgemm_calls += 1;
        check_distinct(a, b, c)?;
        check_len(dims.a_len(), *self.buffers.get(a)?)?;
        check_len(dims.b_len(), *self.buffers.get(b)?)?;
        check_len(dims.c_len(), *self.buffers.get(c)?)?;
        if self.fail_sgemm_on == Some(self.sgemm_calls) {
            return Err(BackendError::Status {
                op: "mock sgemm",
                status: MOCK_KERNEL_STATUS,
            });
        }
        let idx = (self.sgemm_calls - 1) % self.samples.len();
        Ok(self.samples[idx])
    }

    fn free(&mut self, id: BufferId) -> Result<()> {
        match self.buffers.remove(id) {
            Ok(_) => {
                self.frees += 1;
                Ok(())
            }
            Err(e) => {
                self.bad_frees += 1;
                Err(e)
            }
        }
    }
}
