//! Retry-with-backoff executor for fallible remote calls.
//!
//! Wraps any async operation and drives it to completion with bounded
//! attempts and exponential backoff plus jitter:
//!
//! ```text
//! attempt 1 ── fail ──► sleep(base * 2^0 + jitter)
//! attempt 2 ── fail ──► sleep(base * 2^1 + jitter)
//! attempt 3 ── fail ──► return last error
//! ```
//!
//! Every failure is retried unless the caller supplies a classification
//! hook through [`execute_with_policy`]. The executor never inspects the
//! error beyond formatting it for the retry notice.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

/// Retry limits and delays for [`execute`].
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct BackoffConfig {
    /// Total attempts including the first one. Values below 1 behave as 1.
    #[builder(default = 3)]
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every retry after it.
    #[builder(default = Duration::from_millis(1000))]
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to each delay.
    #[builder(default = Duration::from_millis(500))]
    pub max_jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BackoffConfig {
    /// Retries without sleeping. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Attempts actually made, never fewer than one.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay slept after failed `attempt` (1-indexed) before the next one.
    pub fn delay_before_retry(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).saturating_add(jitter)
    }

    fn sample_jitter(&self) -> Duration {
        let bound = u64::try_from(self.max_jitter.as_nanos()).unwrap_or(u64::MAX);
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..bound))
    }
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX`.
fn duration_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Run `operation` until it succeeds or `config.max_attempts` is exhausted.
///
/// On exhaustion the error from the final attempt is returned unchanged.
pub async fn execute<T, E, F, Fut>(operation: F, label: &str, config: &BackoffConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    execute_with_policy(operation, label, config, |_| true).await
}

/// Like [`execute`], but stops early when `should_retry` rejects an error.
pub async fn execute_with_policy<T, E, F, Fut, P>(
    mut operation: F,
    label: &str,
    config: &BackoffConfig,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.effective_attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts {
                    debug!(label, attempt, error = %error, "retries exhausted");
                    return Err(error);
                }
                if !should_retry(&error) {
                    debug!(label, attempt, error = %error, "error classified as terminal");
                    return Err(error);
                }

                let delay = config.delay_before_retry(attempt, config.sample_jitter());
                let delay_ms = duration_millis(delay);
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %error,
                    "Attempt {} for {} failed, retrying in {}ms",
                    attempt,
                    label,
                    delay_ms
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
