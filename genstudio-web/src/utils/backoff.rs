//! Exponential backoff for rate-limited remote calls
//!
//! Delay before retry `n` (1-based) is `min(initial * 2^(n-1), max)` plus a
//! uniform jitter in `[0, jitter)`. The defaults give 5, 10, 20, 40, 60, 60, 60
//! seconds across seven retries.

use genstudio_common::config::RetryConfig;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry budget and delay schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 7,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: secs(config.initial_delay_secs),
            max_delay: secs(config.max_delay_secs),
            jitter: secs(config.jitter_secs),
        }
    }

    /// Same schedule without the random component
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            current: self.initial_delay,
            max: self.max_delay,
            jitter: self.jitter,
        }
    }

    /// Base delays (no jitter) for every retry the policy allows
    pub fn schedule(&self) -> Vec<Duration> {
        let mut backoff = self.clone().without_jitter().backoff();
        (0..self.max_retries).map(|_| backoff.next_delay()).collect()
    }
}

/// Stateful delay generator for one retried call
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    jitter: Duration,
}

impl Backoff {
    /// Delay to wait now; doubles the base for next time, capped at the maximum
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        base + sample_jitter(self.jitter)
    }
}

fn sample_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
    max.mul_f64(fraction)
}

/// Negative, NaN or infinite seconds collapse to zero; huge values cap at one day
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value.min(86_400.0))
    } else {
        Duration::ZERO
    }
}

/// Sleep for `duration` unless `cancel` fires first
///
/// Returns `true` when the full duration elapsed.
pub async fn sleep_or_cancel(duration: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => true,
                _ = token.cancelled() => false,
            }
        }
        None => {
            tokio::time::sleep(duration).await;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = RetryPolicy::default().schedule();
        let secs: Vec<u64> = schedule.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 60, 60, 60]);
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy::default();
        let mut backoff = policy.backoff();
        for base in policy.schedule() {
            let delay = backoff.next_delay();
            assert!(delay >= base);
            assert!(delay < base + Duration::from_secs(1));
        }
    }

    #[test]
    fn test_initial_delay_above_max_is_capped() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_secs(90),
            max_delay: Duration::from_secs(60),
            jitter: Duration::ZERO,
        };
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(60), Duration::from_secs(60)]
        );
    }

    #[test]
    fn test_from_config_rejects_negative_values() {
        let config = RetryConfig {
            max_retries: 3,
            initial_delay_secs: -1.0,
            max_delay_secs: f64::NAN,
            jitter_secs: 0.5,
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.initial_delay, Duration::ZERO);
        assert_eq!(policy.max_delay, Duration::ZERO);
        assert_eq!(policy.jitter, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        assert!(sleep_or_cancel(Duration::from_secs(5), None).await);

        let token = CancellationToken::new();
        token.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(5), Some(&token)).await);
    }
}
