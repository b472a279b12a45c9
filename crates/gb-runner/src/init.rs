//! Random input matrices.
//!
//! Every value produced here lies strictly inside (-1, 1). The generator is
//! always passed in by the caller; nothing in this module seeds or owns a
//! global RNG.

use gb_backend::BackendError;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::error::Result;

/// Largest value of the C library `rand()` on glibc, the integer range the
/// ratio strategy draws from.
const RATIO_MAX: u32 = i32::MAX as u32;

/// How input matrices are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitStrategy {
    /// Uniform real distribution over [-1, 1) with -1 rejected.
    #[default]
    Uniform,
    /// Legacy scheme: `min(u1, u2) / max(u1, u2)` of two uniform integers
    /// in [0, 2^31 - 1] with a fair random sign.
    ///
    /// For continuous iid uniforms `P(min/max <= t) = t`, so the magnitude
    /// is itself uniform on [0, 1] and the signed value is uniform on
    /// (-1, 1). The integer version departs from that only at the edges:
    /// equal draws give exactly 1.0 (or 0/0 when both are zero) and the
    /// f32 rounding of ratios close to 1 can land on 1.0. Those draws are
    /// rejected here. It costs three RNG draws per element instead of one.
    Ratio,
}

/// Produce `len` values strictly inside (-1, 1).
///
/// # Errors
/// Returns `BackendError::Alloc` if the host buffer cannot be reserved.
pub fn random_matrix<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    strategy: InitStrategy,
) -> Result<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| BackendError::Alloc {
        len,
        reason: e.to_string(),
    })?;
    match strategy {
        InitStrategy::Uniform => {
            let dist = Uniform::new(-1.0f32, 1.0f32);
            buf.extend((0..len).map(|_| uniform_open(rng, &dist)));
        }
        InitStrategy::Ratio => buf.extend((0..len).map(|_| ratio_sample(rng))),
    }
    Ok(buf)
}

fn uniform_open<R: Rng + ?Sized>(rng: &mut R, dist: &Uniform<f32>) -> f32 {
    loop {
        let v = dist.sample(rng);
        if v > -1.0 && v < 1.0 {
            return v;
        }
    }
}

fn ratio_sample<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    loop {
        let v1 = rng.gen_range(0..=RATIO_MAX);
        let v2 = rng.gen_range(0..=RATIO_MAX);
        if v1 == v2 {
            continue;
        }
        let value = v1.min(v2) as f32 / v1.max(v2) as f32;
        if value >= 1.0 {
            continue;
        }
        return if rng.gen::<bool>() { value } else { -value };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLES: usize = 200_000;

    fn mean(v: &[f32]) -> f64 {
        v.iter().map(|&x| f64::from(x)).sum::<f64>() / v.len() as f64
    }

    #[test]
    fn test_uniform_open_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let v = random_matrix(&mut rng, SAMPLES, InitStrategy::Uniform).unwrap();
        assert_eq!(v.len(), SAMPLES);
        assert!(v.iter().all(|&x| x > -1.0 && x < 1.0));
    }

    #[test]
    fn test_uniform_mean_near_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let v = random_matrix(&mut rng, SAMPLES, InitStrategy::Uniform).unwrap();
        // Standard error of the mean is ~0.0013 at this sample size.
        assert!(mean(&v).abs() < 0.01);
    }

    #[test]
    fn test_uniform_covers_both_halves() {
        let mut rng = StdRng::seed_from_u64(3);
        let v = random_matrix(&mut rng, SAMPLES, InitStrategy::Uniform).unwrap();
        let below = v.iter().filter(|&&x| x < -0.5).count() as f64 / SAMPLES as f64;
        let above = v.iter().filter(|&&x| x > 0.5).count() as f64 / SAMPLES as f64;
        assert!((below - 0.25).abs() < 0.01);
        assert!((above - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_ratio_open_interval() {
        let mut rng = StdRng::seed_from_u64(5);
        let v = random_matrix(&mut rng, SAMPLES, InitStrategy::Ratio).unwrap();
        assert!(v.iter().all(|&x| x > -1.0 && x < 1.0));
    }

    #[test]
    fn test_ratio_magnitude_is_uniform() {
        let mut rng = StdRng::seed_from_u64(13);
        let v = random_matrix(&mut rng, SAMPLES, InitStrategy::Ratio).unwrap();
        assert!(mean(&v).abs() < 0.01);
        for q in [0.25f32, 0.5, 0.75] {
            let frac = v.iter().filter(|&&x| x.abs() < q).count() as f64 / SAMPLES as f64;
            assert!((frac - f64::from(q)).abs() < 0.01, "P(|x| < {q}) = {frac}");
        }
    }

    #[test]
    fn test_same_seed_same_matrix() {
        for strategy in [InitStrategy::Uniform, InitStrategy::Ratio] {
            let a = random_matrix(&mut StdRng::seed_from_u64(42), 64, strategy).unwrap();
            let b = random_matrix(&mut StdRng::seed_from_u64(42), 64, strategy).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_unreservable_length_is_alloc_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = random_matrix(&mut rng, usize::MAX / 2, InitStrategy::Uniform).unwrap_err();
        assert!(matches!(
            err,
            RunError::Backend(BackendError::Alloc { len, .. }) if len == usize::MAX / 2
        ));
    }

    #[test]
    fn test_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(random_matrix(&mut rng, 0, InitStrategy::Uniform).unwrap().is_empty());
    }

    #[test]
    fn test_default_is_uniform() {
        assert_eq!(InitStrategy::default(), InitStrategy::Uniform);
    }
}
