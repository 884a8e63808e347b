use crate::config::ExtensionConfig;
use std::time::Duration;

/// Exponential backoff ladder for panel requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ExtensionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_doubles_then_caps() {
        let policy = RetryPolicy::default();
        let delays = (0..6)
            .map(|a| policy.delay_for(a).as_millis())
            .collect::<Vec<_>>();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 8000, 8000]);
    }

    #[test]
    fn retries_stop_at_cap() {
        let policy = RetryPolicy::default();
        let retried = (0..10).take_while(|a| policy.should_retry(*a)).count();
        assert_eq!(retried, 3);
    }

    #[test]
    fn huge_attempts_do_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(40), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(8000));
    }

    #[test]
    fn built_from_config() {
        let config = ExtensionConfig {
            max_retries: 5,
            base_backoff_ms: 250,
            max_backoff_ms: 1000,
            ..ExtensionConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay_for(3), Duration::from_millis(1000));
    }
}
