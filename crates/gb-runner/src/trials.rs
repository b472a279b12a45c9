use std::time::Duration;

use tracing::debug;

use crate::error::{Result, RunError};

/// Default number of timed trials per run.
pub const DEFAULT_RUNS: usize = 100;

/// Running minimum of trial durations.
///
/// Only the smallest sample and the sample count are kept, so the result
/// does not depend on the order samples arrive in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinTime {
    best: Option<Duration>,
    count: usize,
}

impl MinTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the minimum.
    pub fn observe(&mut self, sample: Duration) {
        self.count += 1;
        self.best = Some(match self.best {
            Some(best) => best.min(sample),
            None => sample,
        });
    }

    /// Smallest sample seen, or `None` before the first one.
    pub fn best(&self) -> Option<Duration> {
        self.best
    }

    /// Number of samples observed.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Extend<Duration> for MinTime {
    fn extend<I: IntoIterator<Item = Duration>>(&mut self, iter: I) {
        for sample in iter {
            self.observe(sample);
        }
    }
}

impl FromIterator<Duration> for MinTime {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        let mut min = MinTime::new();
        min.extend(iter);
        min
    }
}

/// Call `trial` exactly `runs` times and reduce the results to their minimum.
///
/// The first failing trial aborts the loop and its error is returned.
pub fn run_trials<F>(runs: usize, mut trial: F) -> Result<MinTime>
where
    F: FnMut(usize) -> Result<Duration>,
{
    if runs == 0 {
        return Err(RunError::InvalidConfig(
            "number of runs must be at least 1".to_string(),
        ));
    }

    (0..runs)
        .map(|i| -> Result<Duration> {
            let elapsed = trial(i)?;
            debug!(trial = i, ?elapsed, "trial complete");
            Ok(elapsed)
        })
        .collect()
}
