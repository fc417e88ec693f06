//! Bounded exponential backoff for retryable upstream failures.

use rand::Rng;
use std::time::Duration;

/// Which responses the fetcher retries: 429 and server-side errors.
/// Every other status is terminal for the request.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Backoff schedule: `base * factor^(attempt-1)`, capped, with a
/// uniform jitter fraction applied on top.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// No retries; first failure is terminal. Used by tests and by
    /// callers that prefer to fail fast.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn has_budget(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the given retry (attempt counts from 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_secs_f64() * exp;
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let spread = capped * self.jitter;
            let offset = rand::thread_rng().gen_range(-spread..=spread);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        let d1 = policy.delay_for(1);
        let d2 = policy.delay_for(2);
        let d3 = policy.delay_for(3);
        assert_eq!(d1, Duration::from_millis(250));
        assert_eq!(d2, Duration::from_millis(500));
        assert_eq!(d3, Duration::from_millis(1000));
        // Far attempts saturate at max_delay.
        assert_eq!(policy.delay_for(30), policy.max_delay);
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let policy = RetryPolicy::default();
        for attempt in 1..6 {
            let base = RetryPolicy {
                jitter: 0.0,
                ..policy.clone()
            }
            .delay_for(attempt)
            .as_secs_f64();
            for _ in 0..50 {
                let jittered = policy.delay_for(attempt).as_secs_f64();
                assert!(jittered >= base * 0.8 - 1e-9);
                assert!(jittered <= base * 1.2 + 1e-9);
            }
        }
    }
}
