//! Reconnect policy: how many times, how often, and when to give up.

use std::time::Duration;

use tokio::time::Instant;

use crate::NodeConfig;

/// One scheduled reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// `true` for the last attempt before the policy gives up.
    pub is_final: bool,
}

/// Counts reconnect attempts against a fixed ceiling.
///
/// ```text
/// reset ─→ next_attempt() ─→ next_attempt() ─→ … ─→ None (exhausted)
///   ▲            │                  │
///   └─ success ──┴──────────────────┘
/// ```
///
/// The counter only moves through [`next_attempt`](Self::next_attempt)
/// and only goes back to zero through [`reset`](Self::reset), which the
/// session calls after every successful connect.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    interval: Duration,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            attempts: 0,
            last_attempt: None,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.reconnect_attempts, config.reconnect_interval)
    }

    /// Claims the next attempt, or `None` once the ceiling is reached.
    pub fn next_attempt(&mut self) -> Option<Attempt> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        self.last_attempt = Some(Instant::now());
        Some(Attempt {
            number: self.attempts,
            is_final: self.attempts == self.max_attempts,
        })
    }

    /// Returns `true` when no attempts are left.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Forgets every attempt made so far.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
    }

    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before each attempt.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the most recent attempt started.
    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_attempt_counts_up_to_max() {
        let mut policy = ReconnectPolicy::new(3, Duration::from_secs(1));
        let numbers: Vec<_> = std::iter::from_fn(|| policy.next_attempt()).collect();
        assert_eq!(
            numbers,
            vec![
                Attempt { number: 1, is_final: false },
                Attempt { number: 2, is_final: false },
                Attempt { number: 3, is_final: true },
            ]
        );
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_attempt(), None);
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn test_reset_after_any_number_of_attempts() {
        let mut policy = ReconnectPolicy::new(5, Duration::from_secs(1));
        policy.next_attempt();
        policy.next_attempt();
        assert!(policy.last_attempt().is_some());

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert!(policy.last_attempt().is_none());
        assert_eq!(policy.next_attempt().map(|a| a.number), Some(1));
    }

    #[test]
    fn test_zero_max_attempts_is_exhausted_immediately() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_secs(1));
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_attempt(), None);
    }

    #[test]
    fn test_from_config_uses_reconnect_settings() {
        let config = NodeConfig::default()
            .reconnect_attempts(4)
            .reconnect_interval(Duration::from_millis(250));
        let policy = ReconnectPolicy::from_config(&config);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.interval(), Duration::from_millis(250));
    }
}
