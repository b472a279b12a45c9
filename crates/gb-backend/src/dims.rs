use crate::error::{BackendError, Result};
use std::fmt;

/// Problem size of one SGEMM: A is [m, k], B is [k, n], C is [m, n].
///
/// All three dimensions are positive, and every operand's element count
/// fits in `usize`. There is no other upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    m: usize,
    n: usize,
    k: usize,
}

impl Dims {
    /// Validate and build a dimension triple.
    ///
    /// # Errors
    /// Returns `InvalidDims` if any dimension is zero or an operand's
    /// element count overflows.
    pub fn new(m: usize, n: usize, k: usize) -> Result<Self> {
        let invalid = || BackendError::InvalidDims { m, n, k };
        if m == 0 || n == 0 || k == 0 {
            return Err(invalid());
        }
        m.checked_mul(k).ok_or_else(invalid)?;
        k.checked_mul(n).ok_or_else(invalid)?;
        m.checked_mul(n).ok_or_else(invalid)?;
        Ok(Dims { m, n, k })
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Element count of A (m x k).
    pub fn a_len(&self) -> usize {
        self.m * self.k
    }

    /// Element count of B (k x n).
    pub fn b_len(&self) -> usize {
        self.k * self.n
    }

    /// Element count of C (m x n).
    pub fn c_len(&self) -> usize {
        self.m * self.n
    }

    /// Floating point operations of one multiply: 2 * m * n * k.
    pub fn flops(&self) -> f64 {
        2.0 * self.m as f64 * self.n as f64 * self.k as f64
    }

    /// Bytes moved by a naive C += AB that loads each input once and
    /// loads and stores C once: 4 * (2mn + mk + kn).
    pub fn naive_bytes(&self) -> f64 {
        let elems = 2.0 * self.c_len() as f64 + self.a_len() as f64 + self.b_len() as f64;
        elems * std::mem::size_of::<f32>() as f64
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} n={} k={}", self.m, self.n, self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let d = Dims::new(2, 3, 4).unwrap();
        assert_eq!(d.a_len(), 8);
        assert_eq!(d.b_len(), 12);
        assert_eq!(d.c_len(), 6);
    }

    #[test]
    fn test_zero_rejected() {
        assert!(Dims::new(0, 1, 1).is_err());
        assert!(Dims::new(1, 0, 1).is_err());
        assert!(Dims::new(1, 1, 0).is_err());
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Dims::new(usize::MAX, 2, 1),
            Err(BackendError::InvalidDims { .. })
        ));
    }

    #[test]
    fn test_flops_and_bytes() {
        let d = Dims::new(64, 64, 64).unwrap();
        assert_eq!(d.flops(), 524_288.0);
        // 2*4096 + 4096 + 4096 elements, 4 bytes each
        assert_eq!(d.naive_bytes(), 65_536.0);
    }

    #[test]
    fn test_display() {
        let d = Dims::new(1, 2, 3).unwrap();
        assert_eq!(d.to_string(), "m=1 n=2 k=3");
    }
}
