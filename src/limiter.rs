// src/limiter.rs
// Per-provider token-bucket admission control for scoring/embedding calls.
// Waiting delays only the calling task; there is no hard rejection.

use crate::llm::Provider;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default bucket capacity (burst size)
const DEFAULT_CAPACITY: f64 = 5.0;

/// Default refill rate in tokens per second
const DEFAULT_REFILL_PER_SEC: f64 = 1.0;

/// Token bucket for one provider
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Credit tokens for elapsed time, capped at capacity
    fn refill(&mut self, capacity: f64, per_sec: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * per_sec).min(capacity);
        self.last_refill = now;
    }
}

/// Per-provider token-bucket rate limiter.
///
/// The mutex is never held across an await point: `acquire` computes the
/// required wait under the lock, releases it, sleeps, and re-checks. Other
/// tasks (and other providers) proceed unaffected while one caller waits.
pub struct RateLimiter {
    buckets: Mutex<HashMap<Provider, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC)
    }
}

impl RateLimiter {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: capacity.max(1.0),
            refill_per_sec: refill_per_sec.max(f64::MIN_POSITIVE),
        }
    }

    /// Consume one token for the provider, waiting for a refill if the bucket
    /// is empty. Bounded wait, no rejection.
    pub async fn acquire(&self, provider: Provider) {
        loop {
            let wait = {
                let Ok(mut buckets) = self.buckets.lock() else {
                    return; // Poisoned lock: fail open rather than deadlock callers
                };
                let bucket = buckets
                    .entry(provider)
                    .or_insert_with(|| Bucket::full(self.capacity));
                bucket.refill(self.capacity, self.refill_per_sec);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                // Time until one whole token is available
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };

            debug!(provider = %provider, wait_ms = wait.as_millis() as u64, "Rate limited, waiting for token");
            tokio::time::sleep(wait).await;
        }
    }

    /// Remaining whole tokens for a provider, for diagnostics. Read-only:
    /// the refill credit is computed, not written back.
    pub fn remaining(&self, provider: Provider) -> u32 {
        let Ok(buckets) = self.buckets.lock() else {
            return 0;
        };
        match buckets.get(&provider) {
            Some(bucket) => {
                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity) as u32
            }
            None => self.capacity as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = RateLimiter::new(3.0, 1.0);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire(Provider::DeepSeek).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining(Provider::DeepSeek), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_bucket_waits_for_refill() {
        let limiter = RateLimiter::new(1.0, 2.0); // 2 tokens/sec
        limiter.acquire(Provider::DeepSeek).await;

        let start = Instant::now();
        limiter.acquire(Provider::DeepSeek).await;
        // One token refills in 0.5s at 2 tokens/sec
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_have_independent_buckets() {
        let limiter = RateLimiter::new(1.0, 0.1);
        limiter.acquire(Provider::DeepSeek).await;

        // DeepSeek bucket is empty but Gemini is untouched
        let start = Instant::now();
        limiter.acquire(Provider::Gemini).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining(Provider::DeepSeek), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_reports_without_consuming() {
        let limiter = RateLimiter::new(2.0, 1.0);
        // Untouched provider reports full capacity without creating a bucket
        assert_eq!(limiter.remaining(Provider::Gemini), 2);

        limiter.acquire(Provider::Gemini).await;
        assert_eq!(limiter.remaining(Provider::Gemini), 1);
        assert_eq!(limiter.remaining(Provider::Gemini), 1);

        // Half a token accrued: repeated reads keep flooring to 1
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.remaining(Provider::Gemini), 1);
        assert_eq!(limiter.remaining(Provider::Gemini), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(2.0, 10.0);
        limiter.acquire(Provider::DeepSeek).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(limiter.remaining(Provider::DeepSeek), 2);
    }
}
