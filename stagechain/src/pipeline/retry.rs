//! Retry utilities with configurable backoff and jitter strategies.
//!
//! The default policy is flat: three attempts one second apart, no jitter.
//! Growing backoff and jitter are opt-in.

use crate::cancellation::{Interruption, RunContext};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base (constant)
    #[default]
    Constant,
    /// delay = base * attempt
    Linear,
    /// delay = base * 2^(attempt - 1)
    Exponential,
}

/// Jitter strategy applied to the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_strategy: BackoffStrategy::Constant,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub const fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Attempts actually made when every one fails.
    #[must_use]
    pub const fn effective_attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms;
        let step = attempt.saturating_sub(1);

        let delay = match self.backoff_strategy {
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(u64::from(step) + 1),
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(step)),
        }
        .min(self.max_delay_ms);

        let jittered = match self.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Result of running an operation under a retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Succeeded {
        /// The successful value.
        value: T,
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Error of the last attempt.
        error: E,
        /// Attempts used.
        attempts: u32,
    },
    /// The run was interrupted during an attempt or a backoff sleep.
    Cancelled {
        /// Why the run stopped.
        reason: Interruption,
        /// Attempts started before the interruption.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Attempts used.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Returns true if an attempt succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Executes an operation with retry logic.
///
/// `operation` receives the 1-based attempt number. Every attempt and every
/// sleep between attempts is raced against `ctx`; no sleep follows the
/// last attempt.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    ctx: &RunContext,
    key: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.effective_attempts();
    let mut attempt = 0;

    loop {
        if let Some(reason) = ctx.interruption() {
            return RetryOutcome::Cancelled {
                reason,
                attempts: attempt,
            };
        }
        attempt += 1;

        let error = match ctx.guard(operation(attempt)).await {
            Ok(Ok(value)) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Ok(Err(error)) => error,
            Err(reason) => {
                return RetryOutcome::Cancelled {
                    reason,
                    attempts: attempt,
                }
            }
        };

        if attempt >= max_attempts {
            warn!(key, attempts = attempt, error = %error, "retries exhausted");
            return RetryOutcome::Exhausted {
                error,
                attempts: attempt,
            };
        }

        let delay = config.delay_for(attempt);
        debug!(
            key,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "Retrying after error"
        );

        if let Err(reason) = ctx.guard(tokio::time::sleep(delay)).await {
            return RetryOutcome::Cancelled {
                reason,
                attempts: attempt,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig::new().with_base_delay_ms(1)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Constant);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
        assert_eq!(config.delay_for(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_config_builder() {
        let config = RetryConfig::new()
            .with_max_attempts(5)
            .with_base_delay_ms(500)
            .with_max_delay_ms(10_000)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::Equal);

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 10_000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(config.jitter_strategy, JitterStrategy::Equal);
    }

    #[test]
    fn test_delay_linear_and_exponential() {
        let linear = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(linear.delay_for(1), Duration::from_millis(100));
        assert_eq!(linear.delay_for(3), Duration::from_millis(300));

        let exponential = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(exponential.delay_for(1), Duration::from_millis(100));
        assert_eq!(exponential.delay_for(2), Duration::from_millis(200));
        assert_eq!(exponential.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(config.delay_for(11), Duration::from_millis(5000));
    }

    #[test]
    fn test_full_jitter_stays_in_range() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::Full);
        assert!((0..10).all(|_| config.delay_for(1) <= Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let outcome: RetryOutcome<i32, String> =
            with_retry(&fast(), &RunContext::new(), "test", |_| async { Ok(42) }).await;
        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: 42,
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn test_fail_fail_succeed() {
        let outcome: RetryOutcome<&str, String> =
            with_retry(&fast(), &RunContext::new(), "test", |attempt| async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt}"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: "done",
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_always_fails_makes_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome: RetryOutcome<(), String> =
            with_retry(&fast(), &RunContext::new(), "test", move |attempt| {
                let c = counter.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("boom {attempt}"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            outcome,
            RetryOutcome::Exhausted {
                error: "boom 3".to_string(),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_zero_attempts_treated_as_one() {
        let config = fast().with_max_attempts(0);
        let outcome: RetryOutcome<(), &str> =
            with_retry(&config, &RunContext::new(), "test", |_| async { Err("no") }).await;
        assert_eq!(outcome.attempts(), 1);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_stops_retrying() {
        let ctx = RunContext::new();
        let token = ctx.token().clone();
        let config = RetryConfig::new().with_base_delay_ms(60_000);

        let outcome: RetryOutcome<(), &str> = with_retry(&config, &ctx, "test", |_| {
            let token = token.clone();
            async move {
                token.cancel("shutdown");
                Err("down")
            }
        })
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Cancelled {
                reason: Interruption::Cancelled("shutdown".to_string()),
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let ctx = RunContext::new();
        ctx.token().cancel("early");
        let outcome: RetryOutcome<(), &str> =
            with_retry(&fast(), &ctx, "test", |_| async { Ok(()) }).await;
        assert_eq!(outcome.attempts(), 0);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_attempt() {
        let ctx = RunContext::new().with_timeout(Duration::from_millis(20));
        let outcome: RetryOutcome<(), &str> = with_retry(&fast(), &ctx, "test", |_| async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;

        assert!(matches!(
            outcome,
            RetryOutcome::Cancelled {
                reason: Interruption::DeadlineExceeded,
                attempts: 1
            }
        ));
    }
}
