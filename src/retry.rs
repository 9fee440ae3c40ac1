//! Fixed-delay retry for track downloads.

use std::fmt;
use std::time::Duration;

use crate::error::FlowError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

#[derive(Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub retryable: fn(&FlowError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_DELAY,
            retryable: FlowError::is_transient,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub error: FlowError,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn run<T>(
        &self,
        label: &str,
        op: impl FnMut(u32) -> Result<T, FlowError>,
    ) -> Result<T, Exhausted> {
        self.run_with_sleep(label, op, std::thread::sleep)
    }

    /// Like [`RetryPolicy::run`] with an injectable sleep. `op` receives the
    /// 1-based attempt number.
    pub fn run_with_sleep<T>(
        &self,
        label: &str,
        mut op: impl FnMut(u32) -> Result<T, FlowError>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, Exhausted> {
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if attempt <= self.max_retries && (self.retryable)(&error) => {
                    tracing::warn!(
                        "{label}: attempt {attempt}/{} failed: {error}, retrying in {}s",
                        self.max_attempts(),
                        self.delay.as_secs_f64()
                    );
                    sleep(self.delay);
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!("{label}: giving up after {attempt} attempt(s): {error}");
                    return Err(Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}
