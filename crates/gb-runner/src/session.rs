use std::time::Duration;

use gb_backend::storage::check_len;
use gb_backend::{BufferId, Dims, GemmBackend};
use tracing::{debug, warn};

use crate::error::Result;

/// The three operand buffers of one benchmark run, held in a backend's
/// memory space.
///
/// Every buffer the session allocates is released exactly once: by
/// `close`, or by `Drop` on any other exit path, including a failure half
/// way through `open`.
#[derive(Debug)]
pub struct Session<'b, B: GemmBackend + ?Sized> {
    backend: &'b mut B,
    dims: Dims,
    // A, B, C in that order once `open` has succeeded.
    held: Vec<BufferId>,
}

impl<'b, B: GemmBackend + ?Sized> Session<'b, B> {
    /// Allocate A, B and C on the backend and copy the host matrices in.
    ///
    /// The copies happen here, once, so that they are never part of a
    /// timed trial.
    pub fn open(backend: &'b mut B, dims: Dims, a: &[f32], b: &[f32], c: &[f32]) -> Result<Self> {
        check_len(dims.a_len(), a.len())?;
        check_len(dims.b_len(), b.len())?;
        check_len(dims.c_len(), c.len())?;

        let mut session = Session {
            backend,
            dims,
            held: Vec::with_capacity(3),
        };
        for host in [a, b, c] {
            let id = session.backend.alloc(host.len())?;
            session.held.push(id);
        }
        for (&id, host) in session.held.iter().zip([a, b, c]) {
            session.backend.upload(id, host)?;
        }
        debug!(backend = session.backend.name(), %dims, "session open");
        Ok(session)
    }

    /// One blocking SGEMM on the session's operands: C = alpha * A @ B + beta * C.
    pub fn sgemm(&mut self, alpha: f32, beta: f32) -> Result<Duration> {
        let (a, b, c) = (self.held[0], self.held[1], self.held[2]);
        Ok(self.backend.sgemm(a, b, c, self.dims, alpha, beta)?)
    }

    /// Copy the current contents of C back to the host.
    #[cfg(test)]
    fn read_c(&mut self, out: &mut [f32]) -> Result<()> {
        let c = self.held[2];
        Ok(self.backend.download(c, out)?)
    }

    /// Release every buffer, reporting the first failure.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let mut first_err = None;
        while let Some(id) = self.held.pop() {
            if let Err(e) = self.backend.free(id) {
                warn!(buffer = %id, error = %e, "failed to release buffer");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl<B: GemmBackend + ?Sized> Drop for Session<'_, B> {
    fn drop(&mut self) {
        if !self.held.is_empty() {
            // Errors were already logged by release.
            let _ = self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunError;
    use gb_backend::{BackendError, HostBackend, MockBackend};

    fn dims() -> Dims {
        Dims::new(2, 3, 4).unwrap()
    }

    fn inputs(d: Dims) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        (vec![0.5; d.a_len()], vec![0.25; d.b_len()], vec![0.0; d.c_len()])
    }

    #[test]
    fn test_open_close_releases_everything() {
        let mut mock = MockBackend::new(Duration::from_nanos(1));
        let (a, b, c) = inputs(dims());
        let mut s = Session::open(&mut mock, dims(), &a, &b, &c).unwrap();
        s.sgemm(1.0, 1.0).unwrap();
        s.close().unwrap();

        assert_eq!(mock.alloc_calls(), 3);
        assert_eq!(mock.upload_calls(), 3);
        assert_eq!(mock.frees(), 3);
        assert_eq!(mock.bad_frees(), 0);
        assert_eq!(mock.live_buffers(), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let mut mock = MockBackend::new(Duration::from_nanos(1));
        let (a, b, c) = inputs(dims());
        {
            let _s = Session::open(&mut mock, dims(), &a, &b, &c).unwrap();
        }
        assert_eq!(mock.frees(), 3);
        assert_eq!(mock.live_buffers(), 0);
    }

    #[test]
    fn test_failed_open_releases_partial_allocations() {
        let mut mock = MockBackend::new(Duration::from_nanos(1)).fail_alloc_on(2);
        let (a, b, c) = inputs(dims());
        let err = Session::open(&mut mock, dims(), &a, &b, &c).unwrap_err();

        assert!(matches!(err, RunError::Backend(BackendError::Status { .. })));
        assert_eq!(mock.alloc_calls(), 2);
        assert_eq!(mock.upload_calls(), 0);
        assert_eq!(mock.sgemm_calls(), 0);
        assert_eq!(mock.frees(), 1);
        assert_eq!(mock.bad_frees(), 0);
        assert_eq!(mock.live_buffers(), 0);
    }

    #[test]
    fn test_wrong_host_length_allocates_nothing() {
        let mut mock = MockBackend::new(Duration::from_nanos(1));
        let (a, b, _) = inputs(dims());
        let err = Session::open(&mut mock, dims(), &a, &b, &[0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            RunError::Backend(BackendError::LengthMismatch { expected: 6, got: 5 })
        ));
        assert_eq!(mock.alloc_calls(), 0);
    }

    #[test]
    fn test_host_round_trip_through_session() {
        let mut host = HostBackend::new();
        let d = Dims::new(1, 1, 2).unwrap();
        let mut s = Session::open(&mut host, d, &[1.0, 2.0], &[3.0, 4.0], &[0.5]).unwrap();
        s.sgemm(1.0, 1.0).unwrap();
        let mut out = [0.0];
        s.read_c(&mut out).unwrap();
        assert_eq!(out[0], 11.5);
        s.close().unwrap();
    }
}
