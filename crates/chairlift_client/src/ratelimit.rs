//! Token-bucket throttling for upstream requests.
//!
//! One bucket per client instance; every request (including pagination
//! follow-ups and cache-miss detail fetches) draws a token first.

use chairlift_protocol::defaults;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with a sustained refill rate and a burst capacity.
///
/// `acquire` suspends until a token is available; tokens accrue
/// continuously rather than on a timer tick.
pub struct TokenBucket {
    capacity: f64,
    rate_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            rate_per_sec: rate_per_sec.max(0.01),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Modest sustained rate, small burst.
    pub fn default_limits() -> Self {
        Self::new(defaults::DEFAULT_RATE_PER_SEC, defaults::DEFAULT_RATE_BURST)
    }

    /// Take one token, waiting for refill when the bucket is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.rate_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (for diagnostics).
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        state.last_refill = now;
        state.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_throttle() {
        let bucket = TokenBucket::new(10.0, 3);
        // Burst drains immediately.
        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;
        assert!(bucket.available().await < 1.0);

        // Fourth token requires ~100ms of refill at 10/s.
        let before = Instant::now();
        bucket.acquire().await;
        let waited = before.elapsed();
        assert!(waited >= Duration::from_millis(90), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_caps_at_capacity() {
        let bucket = TokenBucket::new(100.0, 2);
        bucket.acquire().await;
        bucket.acquire().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        let available = bucket.available().await;
        assert!((available - 2.0).abs() < 1e-9, "available {available}");
    }
}
