//! Bounded retry policies, one per actuation class.

use kitsmith_config::{RetryConfig, RetryPolicyConfig};
use std::time::Duration;

/// Attempt budget with exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A single attempt, never retried.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the next attempt after `retries_used` retries.
    pub fn backoff(&self, retries_used: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let multiplier = 1u128 << retries_used.min(20);
        let backoff_ms = base_ms.saturating_mul(multiplier).min(max_ms);
        Duration::from_millis(u64::try_from(backoff_ms).unwrap_or(u64::MAX))
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

/// The policies shared by every stage of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicies {
    pub movement: RetryPolicy,
    pub container_open: RetryPolicy,
    pub placement: RetryPolicy,
}

impl From<&RetryConfig> for RetryPolicies {
    fn from(config: &RetryConfig) -> Self {
        Self {
            movement: (&config.movement).into(),
            container_open: (&config.container_open).into(),
            placement: (&config.placement).into(),
        }
    }
}

impl Default for RetryPolicies {
    fn default() -> Self {
        (&RetryConfig::default()).into()
    }
}
