use gb_backend::Dims;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, RunError};
use crate::init::InitStrategy;
use crate::trials::DEFAULT_RUNS;

/// Parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Problem size.
    pub dims: Dims,
    /// Number of timed trials.
    pub runs: usize,
    /// Scale applied to A @ B.
    pub alpha: f32,
    /// Scale applied to the existing C; 1.0 accumulates.
    pub beta: f32,
    /// How A, B and the initial C are filled.
    pub init: InitStrategy,
    /// Seed for the input generator. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl BenchConfig {
    /// Defaults: `DEFAULT_RUNS` trials, C += A @ B, uniform inputs, OS seed.
    pub fn new(dims: Dims) -> Self {
        BenchConfig {
            dims,
            runs: DEFAULT_RUNS,
            alpha: 1.0,
            beta: 1.0,
            init: InitStrategy::Uniform,
            seed: None,
        }
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// # Errors
    /// Returns `InvalidConfig` for zero runs or non-finite scale factors.
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(RunError::InvalidConfig(
                "number of runs must be at least 1".to_string(),
            ));
        }
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(RunError::InvalidConfig(format!(
                "alpha={} and beta={} must be finite",
                self.alpha, self.beta
            )));
        }
        Ok(())
    }

    /// Build the input generator for one run.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn dims() -> Dims {
        Dims::new(8, 8, 8).unwrap()
    }

    #[test]
    fn test_defaults() {
        let c = BenchConfig::new(dims());
        assert_eq!(c.runs, DEFAULT_RUNS);
        assert_eq!(c.alpha, 1.0);
        assert_eq!(c.beta, 1.0);
        assert_eq!(c.init, InitStrategy::Uniform);
        assert_eq!(c.seed, None);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_zero_runs_invalid() {
        assert!(BenchConfig::new(dims()).with_runs(0).validate().is_err());
    }

    #[test]
    fn test_non_finite_scale_invalid() {
        let mut c = BenchConfig::new(dims());
        c.alpha = f32::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let c = BenchConfig::new(dims()).with_seed(Some(99));
        let x: u64 = c.rng().gen();
        let y: u64 = c.rng().gen();
        assert_eq!(x, y);
    }
}
