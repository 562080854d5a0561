//! Bounded wait-and-retry policy for reaching the environment service

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_wait_interval_ms() -> u64 {
    2_000
}

fn default_max_attempts() -> Option<u32> {
    Some(30)
}

/// How long to keep polling an unavailable service
///
/// With both bounds unset the client waits forever (until shutdown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Pause between attempts
    #[serde(default = "default_wait_interval_ms")]
    pub wait_interval_ms: u64,
    /// Give up after this many failed attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first attempt
    #[serde(default)]
    pub max_elapsed_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            wait_interval_ms: default_wait_interval_ms(),
            max_attempts: default_max_attempts(),
            max_elapsed_ms: None,
        }
    }
}

impl RetryPolicy {
    /// Keep retrying until shutdown
    #[must_use]
    pub fn unbounded(wait_interval: Duration) -> Self {
        Self {
            wait_interval_ms: duration_ms(wait_interval),
            max_attempts: None,
            max_elapsed_ms: None,
        }
    }

    /// Give up after `max_attempts` failures
    #[must_use]
    pub fn attempts(max_attempts: u32, wait_interval: Duration) -> Self {
        Self {
            wait_interval_ms: duration_ms(wait_interval),
            max_attempts: Some(max_attempts),
            max_elapsed_ms: None,
        }
    }

    /// Pause between attempts
    #[must_use]
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    /// Whether no further attempt is allowed after `failed` failures
    #[must_use]
    pub fn exhausted(&self, failed: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| failed >= max)
            || self
                .max_elapsed_ms
                .is_some_and(|max| elapsed >= Duration::from_millis(max))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_bound() {
        let policy = RetryPolicy::attempts(3, Duration::from_millis(10));
        assert!(!policy.exhausted(2, Duration::ZERO));
        assert!(policy.exhausted(3, Duration::ZERO));
    }

    #[test]
    fn test_elapsed_bound() {
        let policy = RetryPolicy {
            wait_interval_ms: 10,
            max_attempts: None,
            max_elapsed_ms: Some(100),
        };
        assert!(!policy.exhausted(1_000, Duration::from_millis(99)));
        assert!(policy.exhausted(1, Duration::from_millis(100)));
    }

    #[test]
    fn test_unbounded_never_exhausts() {
        let policy = RetryPolicy::unbounded(Duration::from_secs(2));
        assert!(!policy.exhausted(u32::MAX, Duration::from_secs(86_400)));
        assert_eq!(policy.wait_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_serde_defaults() {
        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());

        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": null}"#).unwrap();
        assert_eq!(policy.max_attempts, None);
    }
}
