use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::{FetchError, FetchResult};

/// Bounded attempts with a linearly growing delay plus uniform jitter.
///
/// The delay before attempt `n` (1-based) is `base_delay * n` plus a random
/// duration in `jitter_min..=jitter_max`. Every attempt waits, including the
/// first, so back-to-back scheduled runs do not hit the page in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// No waiting at all. Handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(attempt);
        let jitter = if self.jitter_max > self.jitter_min {
            let secs = rand::rng()
                .random_range(self.jitter_min.as_secs_f64()..=self.jitter_max.as_secs_f64());
            Duration::from_secs_f64(secs)
        } else {
            self.jitter_min
        };
        base.saturating_add(jitter)
    }
}

/// Run `op` until it succeeds, returns a non-retryable error, or the policy
/// runs out of attempts. `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> FetchResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        let delay = policy.delay_for(attempt);
        if !delay.is_zero() {
            tracing::debug!("attempt {}/{} in {:?}", attempt, attempts, delay);
            tokio::time::sleep(delay).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!("[RETRY {}/{}] {}", attempt, attempts, e);
                last = Some(e);
            }
        }
    }

    let last = last.unwrap_or_else(|| FetchError::Transport("no attempt was made".to_string()));
    Err(FetchError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly_within_jitter_bounds() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(1500),
        };

        for attempt in 1..=5 {
            let delay = policy.delay_for(attempt);
            let base = Duration::from_secs(2 * attempt as u64);
            assert!(delay >= base + Duration::from_millis(500), "{:?}", delay);
            assert!(delay <= base + Duration::from_millis(1500), "{:?}", delay);
        }
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = retry(&RetryPolicy::immediate(5), |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    Err(FetchError::Blocked(429))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: FetchResult<()> = retry(&RetryPolicy::immediate(4), |_| {
            calls += 1;
            async { Err(FetchError::Status(503)) }
        })
        .await;

        assert_eq!(calls, 4);
        match result {
            Err(FetchError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*last, FetchError::Status(503)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let mut calls = 0;
        let result: FetchResult<()> = retry(&RetryPolicy::immediate(5), |_| {
            calls += 1;
            async { Err(FetchError::InvalidUrl("nope".to_string())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
