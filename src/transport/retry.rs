use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::ClientError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF: f64 = 2.0;
/// Longest single wait between attempts, whatever the backoff.
pub const MAX_DELAY: Duration = Duration::from_secs(300);

/// Retry with exponential backoff.
///
/// A call is attempted up to `max_attempts` times. Before retry `n`
/// (0-based) the policy sleeps `initial_delay * backoff^n`. Only transient
/// errors are retried; when attempts run out the last error is returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Multiplier applied per retry. Must be finite and at least 1.0.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Delay slept before retry number `retry` (0-based), capped at [`MAX_DELAY`].
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut retry = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(operation, attempt = retry + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && retry + 1 < attempts => {
                    let delay = self.delay_for(retry);
                    warn!(
                        operation,
                        attempt = retry + 1,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!(operation, attempts, error = %err, "Giving up after retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}
