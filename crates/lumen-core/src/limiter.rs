//! Client-side token-bucket rate limiter.
//!
//! One bucket is shared across all invocations: capacity equals the
//! configured requests-per-window and refills linearly over the window.
//! Acquisition is bounded; a caller that cannot get a token within its
//! timeout reports a local transport failure instead of queueing forever.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Shared token bucket.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Creates a bucket with `max_requests` capacity refilled linearly
    /// over `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests.max(1));
        let refill_per_sec = capacity / window.as_secs_f64().max(f64::EPSILON);
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(Bucket { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    /// Takes one token, waiting up to `max_wait` for a refill.
    ///
    /// Returns `false` when no token became available in time.
    pub async fn acquire(&self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            let wait = {
                let mut bucket = self.state.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return true;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };

            let now = Instant::now();
            if now + wait > deadline {
                // Tokens accrue only with time, so the outcome at the
                // deadline is already known.
                debug!(needed_ms = wait.as_millis() as u64, "local rate limit exhausted");
                tokio::time::sleep_until(deadline).await;
                return false;
            }
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;
    }
}
