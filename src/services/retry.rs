//! Fixed-delay retry on rate limits.

use crate::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

/// Default wait after a rate-limited call.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Blocks the current thread for a duration.
///
/// Retry waits and delete pacing go through this trait so tests can observe
/// them without sleeping.
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates a recording sleeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations slept so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of sleeps equal to `duration`.
    #[must_use]
    pub fn count(&self, duration: Duration) -> usize {
        self.sleeps().iter().filter(|d| **d == duration).count()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Retries calls that fail with a rate-limit condition.
///
/// A rate-limited call is re-issued unchanged after a fixed wait. Any other
/// error is returned to the caller immediately. By default there is no retry
/// ceiling; [`RetryPolicy::with_max_attempts`] adds one.
#[derive(Clone)]
pub struct RetryPolicy {
    wait: Duration,
    max_attempts: Option<u32>,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("wait", &self.wait)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WAIT)
    }
}

impl RetryPolicy {
    /// Creates a policy waiting `wait` between attempts.
    #[must_use]
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            max_attempts: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Caps the number of attempts per call (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.map(|n| n.max(1));
        self
    }

    /// Replaces the sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Wait between attempts.
    #[must_use]
    pub const fn wait(&self) -> Duration {
        self.wait
    }

    /// The sleeper used for waits.
    #[must_use]
    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    /// Runs `call` until it succeeds or fails with a non-rate-limit error.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not a rate limit, or
    /// [`Error::OperationFailed`] once the attempt ceiling is reached.
    pub fn run<T, F>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let err = match call() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() => err,
                Err(err) => return Err(err),
            };

            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(Error::OperationFailed {
                    operation: operation.to_string(),
                    cause: format!("still rate limited after {attempt} attempts: {err}"),
                });
            }

            warn!(
                operation,
                attempt,
                wait_ms = u64::try_from(self.wait.as_millis()).unwrap_or(u64::MAX),
                "Rate limited, retrying"
            );
            self.sleeper.sleep(self.wait);
        }
    }
}
