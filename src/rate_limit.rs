//! Token-bucket rate limiter keyed by client IP.
//!
//! Applied to the login endpoint so credential guessing burns through a
//! small per-IP budget instead of the identity collaborator.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::RateLimit;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-process token-bucket rate limiter keyed by client IP.
pub struct RateLimiter {
    max_tokens: u32,
    window_secs: u64,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// * `max_tokens` — attempts allowed per window.
    /// * `window_secs` — refill window in seconds.
    pub fn new(max_tokens: u32, window_secs: u64) -> Self {
        Self {
            max_tokens,
            window_secs,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Create a limiter from the `[rate_limit]` config section.
    pub fn from_config(config: &RateLimit) -> Self {
        Self::new(config.login_attempts, config.window_secs)
    }

    /// Check whether `ip` is within its budget, consuming one attempt.
    ///
    /// Returns `Err(retry_after_secs)` when the bucket is empty.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().unwrap();
        let now = Instant::now();

        let bucket = buckets.entry(ip).or_insert(Bucket {
            tokens: self.max_tokens as f64,
            last_refill: now,
        });

        // Refill tokens based on elapsed time
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        let refill_rate = self.max_tokens as f64 / self.window_secs as f64;
        bucket.tokens = (bucket.tokens + elapsed * refill_rate).min(self.max_tokens as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            // Time until at least one attempt is available again
            let deficit = 1.0 - bucket.tokens;
            let retry_after = (deficit / refill_rate).ceil() as u64;
            Err(retry_after.max(1))
        }
    }

    /// Remove stale entries that have fully refilled.
    pub fn cleanup(&self) {
        let mut buckets = self.buckets.lock().unwrap();
        let now = Instant::now();
        let window = std::time::Duration::from_secs(self.window_secs * 2);
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < window);
    }
}
