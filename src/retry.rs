//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::ClientError;

/// Backoff configuration for a [`RetryManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub backoff_multiplier: f64,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Jitter fraction; each delay is scaled by a random factor in
    /// `[1 - jitter, 1]`. Zero disables jitter.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Retries an async operation under a [`RetryPolicy`].
///
/// Retryability is the caller's call: [`execute`](Self::execute) takes a
/// predicate alongside the operation, so the same manager can guard a
/// cold connect (retry on transport errors) and a resubmission stream
/// (never retry, `|_| false`) without reconfiguration.
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    policy: RetryPolicy,
}

impl RetryManager {
    /// Creates a manager with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation`, retrying failures the predicate accepts.
    ///
    /// Delays grow as `base_delay × multiplier^attempt`, capped and
    /// jittered. A failure the predicate rejects propagates immediately;
    /// a retryable failure on the last attempt is wrapped in
    /// [`ClientError::RetryExhausted`].
    pub async fn execute<T, F, Fut, P>(
        &self,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        P: Fn(&ClientError) -> bool,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) && attempt < self.policy.max_retries => {
                    let delay = compute_backoff(&self.policy, attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if is_retryable(&e) => {
                    return Err(ClientError::RetryExhausted {
                        attempts: attempt + 1,
                        last_error: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `min(base × multiplier^attempt, max) × random(1 - jitter, 1)`.
fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    // attempt is bounded by max_retries, well below i32::MAX
    #[allow(clippy::cast_possible_wrap)]
    let base = policy.base_delay.as_secs_f64() * policy.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(policy.max_delay.as_secs_f64());

    let jitter_factor = if policy.jitter > 0.0 {
        let min_factor = 1.0 - policy.jitter;
        let mut rng = rand::rng();
        rng.random_range(min_factor..=1.0)
    } else {
        1.0
    };

    Duration::from_secs_f64(capped * jitter_factor)
}
