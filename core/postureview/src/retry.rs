use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Blocks the caller between attempts. Injected so tests can use a fake clock.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Exponential backoff for retryable analysis failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Wait before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Factor applied to the wait after every retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 2000,
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let ms = self.initial_delay_ms as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(ms.round() as u64)
    }

    /// The full wait schedule, one entry per retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|r| self.delay_for(r)).collect()
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are exhausted. `operation` receives the zero-based
    /// attempt number.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, AnalysisError>
    where
        F: FnMut(u32) -> Result<T, AnalysisError>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "attempt {} failed ({err}), retrying in {}ms",
                        attempt + 1,
                        delay.as_millis()
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
