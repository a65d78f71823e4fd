//! Retry delay strategies and status predicates
//!
//! This module implements the backoff curves used by the standard policy and
//! the predicate deciding which failed statuses are worth another attempt.

use crate::types::{RetryPolicyConfig, RetryStrategy};
use rand::Rng;
use std::time::Duration;

/// Calculate the delay before the next retry attempt
///
/// # Arguments
///
/// * `policy` - The retry policy containing strategy and timing parameters
/// * `attempt` - The attempt that just failed (1-indexed)
/// * `jitter` - Whether to apply random jitter to the delay
///
/// # Example
///
/// ```rust
/// use courier_core::retry::calculate_delay;
/// use courier_core::types::{RetryPolicyConfig, RetryStrategy};
///
/// let policy = RetryPolicyConfig {
///     strategy: RetryStrategy::ExponentialBackoff,
///     initial_delay_ms: 1000,
///     max_delay_ms: 30000,
///     ..RetryPolicyConfig::default()
/// };
///
/// assert_eq!(calculate_delay(&policy, 1, false).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 2, false).as_millis(), 2000);
/// ```
pub fn calculate_delay(policy: &RetryPolicyConfig, attempt: u32, jitter: bool) -> Duration {
    // Attempt is 1-indexed, but we want 0-indexed for calculations
    let attempt_index = attempt.saturating_sub(1);

    let base_delay_ms = match policy.strategy {
        RetryStrategy::None => 0,

        RetryStrategy::FixedDelay => policy.initial_delay_ms,

        RetryStrategy::ExponentialBackoff => {
            let multiplier = policy.backoff_multiplier.powf(attempt_index as f64);
            // Float-to-int casts saturate, so huge exponents land on u64::MAX
            (policy.initial_delay_ms as f64 * multiplier) as u64
        }

        RetryStrategy::LinearBackoff => policy
            .initial_delay_ms
            .saturating_mul(attempt_index as u64 + 1),
    };

    let capped_delay_ms = base_delay_ms.min(policy.max_delay_ms);

    // Up to 25% on top of the capped delay
    let final_delay_ms = if jitter && capped_delay_ms > 0 {
        let jitter_range = capped_delay_ms / 4;
        let jitter_value = rand::rng().random_range(0..=jitter_range);
        capped_delay_ms.saturating_add(jitter_value)
    } else {
        capped_delay_ms
    };

    Duration::from_millis(final_delay_ms)
}

/// Decides which failed response statuses are retryable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPredicate {
    retryable_codes: Vec<u16>,
}

impl StatusPredicate {
    /// Default retryable codes: 408, 425, 429, 500, 502, 503, 504
    pub fn default_http() -> Self {
        Self {
            retryable_codes: vec![408, 425, 429, 500, 502, 503, 504],
        }
    }

    /// Create a predicate with custom retryable status codes
    pub fn with_codes(codes: Vec<u16>) -> Self {
        Self {
            retryable_codes: codes,
        }
    }

    /// Check if a status code is retryable
    pub fn is_retryable_code(&self, code: u16) -> bool {
        self.retryable_codes.contains(&code)
    }

    /// The retryable status codes
    pub fn codes(&self) -> &[u16] {
        &self.retryable_codes
    }
}

impl Default for StatusPredicate {
    fn default() -> Self {
        Self::default_http()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(strategy: RetryStrategy, initial_delay_ms: u64, max_delay_ms: u64) -> RetryPolicyConfig {
        RetryPolicyConfig {
            strategy,
            initial_delay_ms,
            max_delay_ms,
            ..RetryPolicyConfig::default()
        }
    }

    #[test]
    fn test_none_strategy() {
        let policy = policy(RetryStrategy::None, 1000, 30000);

        for attempt in 1..=3 {
            assert_eq!(calculate_delay(&policy, attempt, false), Duration::ZERO);
            assert_eq!(calculate_delay(&policy, attempt, true), Duration::ZERO);
        }
    }

    #[test]
    fn test_fixed_strategy() {
        let policy = policy(RetryStrategy::FixedDelay, 1000, 30000);

        for attempt in 1..=3 {
            assert_eq!(
                calculate_delay(&policy, attempt, false),
                Duration::from_millis(1000)
            );
        }
    }

    #[test]
    fn test_exponential_strategy() {
        let policy = policy(RetryStrategy::ExponentialBackoff, 1000, 30000);

        // 1000 * 2^(attempt - 1)
        assert_eq!(calculate_delay(&policy, 1, false), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 2, false), Duration::from_millis(2000));
        assert_eq!(calculate_delay(&policy, 3, false), Duration::from_millis(4000));
        assert_eq!(calculate_delay(&policy, 5, false), Duration::from_millis(16000));
    }

    #[test]
    fn test_exponential_custom_multiplier() {
        let policy = RetryPolicyConfig {
            backoff_multiplier: 3.0,
            ..policy(RetryStrategy::ExponentialBackoff, 100, 100000)
        };

        assert_eq!(calculate_delay(&policy, 1, false), Duration::from_millis(100));
        assert_eq!(calculate_delay(&policy, 2, false), Duration::from_millis(300));
        assert_eq!(calculate_delay(&policy, 3, false), Duration::from_millis(900));
    }

    #[test]
    fn test_linear_strategy() {
        let policy = policy(RetryStrategy::LinearBackoff, 1000, 30000);

        assert_eq!(calculate_delay(&policy, 1, false), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 2, false), Duration::from_millis(2000));
        assert_eq!(calculate_delay(&policy, 3, false), Duration::from_millis(3000));
    }

    #[test]
    fn test_max_delay_caps_all_strategies() {
        for strategy in [
            RetryStrategy::FixedDelay,
            RetryStrategy::ExponentialBackoff,
            RetryStrategy::LinearBackoff,
        ] {
            let policy = RetryPolicyConfig {
                backoff_multiplier: 10.0,
                ..policy(strategy, 10000, 5000)
            };

            for attempt in [1, 2, 10, 64, u32::MAX] {
                let delay = calculate_delay(&policy, attempt, false);
                assert!(
                    delay <= Duration::from_millis(5000),
                    "Strategy {:?} at attempt {} exceeded max_delay",
                    strategy,
                    attempt
                );
            }
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = policy(RetryStrategy::FixedDelay, 1000, 30000);

        for _ in 0..100 {
            let delay = calculate_delay(&policy, 1, true);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn test_status_predicate() {
        let predicate = StatusPredicate::default_http();

        assert!(predicate.is_retryable_code(408));
        assert!(predicate.is_retryable_code(429));
        assert!(predicate.is_retryable_code(503));

        assert!(!predicate.is_retryable_code(400));
        assert!(!predicate.is_retryable_code(401));
        assert!(!predicate.is_retryable_code(404));
        assert!(!predicate.is_retryable_code(409));
    }

    #[test]
    fn test_custom_status_predicate() {
        let predicate = StatusPredicate::with_codes(vec![410]);
        assert!(predicate.is_retryable_code(410));
        assert!(!predicate.is_retryable_code(503));
        assert_eq!(predicate.codes(), &[410]);
    }
}
