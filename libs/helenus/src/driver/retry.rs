//! Backoff applied while opening a driver session.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

/// How many times [`super::connect_with_retry`] re-dials and how long it waits in between.
///
/// Waits double from `initial_delay` up to `max_delay`. With jitter each wait is
/// drawn from the upper half of its nominal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectBackoff {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for ConnectBackoff {
    fn default() -> Self {
        Self {
            attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl ConnectBackoff {
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max.max(initial);
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Nominal wait after the `failures`-th failed attempt, before jitter
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn wait_after(&self, failures: u32) -> Duration {
        let nominal = self.delay_after(failures);
        if !self.jitter {
            return nominal;
        }
        let half = nominal / 2;
        let spread = half.as_millis() as u64;
        if spread == 0 {
            return nominal;
        }
        let offset = (Uuid::new_v4().as_u128() % u128::from(spread + 1)) as u64;
        half + Duration::from_millis(offset)
    }

    /// Run `dial` until it succeeds or the attempts are used up; the last error is returned.
    pub async fn run<F, Fut, T, E>(&self, mut dial: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut failures = 0;
        loop {
            let err = match dial().await {
                Ok(value) => {
                    if failures > 0 {
                        debug!(failures, "Connected after retries");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };
            failures += 1;
            if failures >= self.attempts {
                warn!(attempts = failures, error = %err, "Giving up on cluster connection");
                return Err(err);
            }
            let wait = self.wait_after(failures);
            debug!(failures, wait_ms = wait.as_millis() as u64, error = %err, "Connect failed, retrying");
            tokio::time::sleep(wait).await;
        }
    }
}
