//! Bounded retry with delay.
//!
//! Every remote call in Wayfare goes through [`RetryingCaller`]. The caller
//! picks a [`DelayPolicy`] and decides what exhaustion means: the pipeline
//! stages substitute fallback text, composition and synthesis hand back the
//! last error.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How long to wait after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayPolicy {
    /// Same delay after every failure.
    Fixed(Duration),
    /// `min(cap, base * 2^(n-1))` scaled by a uniform jitter in `[0.5, 1.5]`,
    /// where `n` is the 1-based attempt that just failed.
    ExponentialJitter { base: Duration, cap: Duration },
}

impl DelayPolicy {
    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            DelayPolicy::Fixed(delay) => *delay,
            DelayPolicy::ExponentialJitter { .. } => {
                let jitter = rand::thread_rng().gen_range(0.5..=1.5);
                self.unjittered_delay(attempt).mul_f64(jitter)
            }
        }
    }

    /// Delay without jitter applied.
    pub fn unjittered_delay(&self, attempt: u32) -> Duration {
        match self {
            DelayPolicy::Fixed(delay) => *delay,
            DelayPolicy::ExponentialJitter { base, cap } => {
                let exponent = attempt.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << exponent).min(*cap)
            }
        }
    }
}

/// Attempt budget plus delay policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: DelayPolicy,
}

impl RetryPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayPolicy::Fixed(delay),
        }
    }

    /// Exponential backoff with jitter, capped.
    pub fn exponential(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayPolicy::ExponentialJitter { base, cap },
        }
    }
}

/// Runs a fallible async operation under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingCaller {
    policy: RetryPolicy,
}

impl RetryingCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempts that will actually be made (at least one).
    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. `on_retry` is called
    /// with the failed attempt number and its error before each sleep; it is
    /// not called after the final attempt. Returns the last error on
    /// exhaustion.
    pub async fn call<T, E, F, Fut, R>(&self, mut operation: F, mut on_retry: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(u32, &E),
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts => {
                    let delay = self.policy.delay.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, will retry: {}",
                        err
                    );
                    on_retry(attempt, &err);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => {
                    warn!(attempt, "Giving up after {} attempts: {}", attempt, err);
                    return Err(err);
                }
            }
        }
    }

    /// Like [`call`](Self::call), but exhaustion yields `fallback(last_error)`.
    pub async fn call_or_else<T, E, F, Fut, R, D>(&self, operation: F, on_retry: R, fallback: D) -> T
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(u32, &E),
        D: FnOnce(E) -> T,
        E: std::fmt::Display,
    {
        match self.call(operation, on_retry).await {
            Ok(value) => value,
            Err(err) => fallback(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn no_delay(max_attempts: u32) -> RetryingCaller {
        RetryingCaller::new(RetryPolicy::fixed(max_attempts, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = no_delay(3)
            .call(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, String>(42) }
                },
                |_, _| panic!("no retry expected"),
            )
            .await;

        assert_eq!(assert_ok!(result), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut retried = Vec::new();
        let result = no_delay(3)
            .call(
                |attempt| async move {
                    if attempt < 3 {
                        Err(format!("failure {}", attempt))
                    } else {
                        Ok(attempt)
                    }
                },
                |attempt, _| retried.push(attempt),
            )
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(retried, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_returns_last_error_on_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = no_delay(3)
            .call(
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(format!("failure {}", attempt)) }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(assert_err!(result), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fallback_on_exhaustion() {
        let text = no_delay(2)
            .call_or_else(
                |_| async { Err::<String, _>("down") },
                |_, _| {},
                |err| format!("fallback after {}", err),
            )
            .await;

        assert_eq!(text, "fallback after down");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = no_delay(0)
            .call(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("nope") }
                },
                |_, _| {},
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exponential_schedule() {
        let policy = DelayPolicy::ExponentialJitter {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(300),
        };

        assert_eq!(policy.unjittered_delay(1), Duration::from_secs(2));
        assert_eq!(policy.unjittered_delay(2), Duration::from_secs(4));
        assert_eq!(policy.unjittered_delay(4), Duration::from_secs(16));
        assert_eq!(policy.unjittered_delay(9), Duration::from_secs(300));
        assert_eq!(policy.unjittered_delay(40), Duration::from_secs(300));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = DelayPolicy::ExponentialJitter {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(300),
        };

        for _ in 0..200 {
            let delay = policy.delay_for(3);
            assert!(delay >= Duration::from_secs(4));
            assert!(delay <= Duration::from_secs(12));
        }
    }

    #[test]
    fn test_fixed_delay() {
        let policy = DelayPolicy::Fixed(Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(5), Duration::from_secs(2));
    }
}
