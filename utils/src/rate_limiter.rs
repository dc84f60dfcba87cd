//! Token bucket rate limiting for RPC providers.
//!
//! A [`CompoundRateLimiter`] holds several buckets (e.g. per minute and per second)
//! and only hands out permits when every one of them can pay for the request.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::warn;

use crate::{config::ScanConfig, network::ANKR_URL};

/// Burst ceiling Ankr enforces on top of the per-minute quota.
pub const ANKR_REQUESTS_PER_SECOND: u32 = 30;

const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketSpec {
    pub capacity: u32,
    pub refill_interval: Duration,
}

impl BucketSpec {
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
        }
    }

    pub fn per_second(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(1))
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }
}

struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_update: Instant,
}

impl TokenBucket {
    fn new(spec: BucketSpec) -> Self {
        let capacity = spec.capacity as f64;
        TokenBucket {
            tokens: capacity,
            capacity,
            refill_rate: capacity / spec.refill_interval.as_secs_f64(),
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_update);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
        self.tokens = (self.tokens + new_tokens).min(self.capacity);
        self.last_update = now;
    }

    fn has(&self, amount: u32) -> bool {
        self.tokens >= amount as f64
    }

    /// Debits `amount` and returns the whole tokens left.
    fn take(&mut self, amount: u32) -> u32 {
        self.tokens -= amount as f64;
        self.tokens as u32
    }

    /// Time until `amount` tokens are available, `None` if the bucket can never hold them.
    fn time_until(&self, amount: u32) -> Option<Duration> {
        let amount = amount as f64;
        if amount > self.capacity || self.refill_rate <= 0.0 {
            return None;
        }
        let deficit = (amount - self.tokens).max(0.0);
        Some(Duration::from_secs_f64(deficit / self.refill_rate))
    }

    fn available(&self) -> u32 {
        self.tokens as u32
    }
}

#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Waits until `permits` can be granted and consumes them.
    async fn acquire(&self, permits: u32) -> u32;
}

/// Several token buckets acting as a single gate.
pub struct CompoundRateLimiter {
    buckets: Mutex<Vec<TokenBucket>>,
}

impl CompoundRateLimiter {
    pub fn new(specs: impl IntoIterator<Item = BucketSpec>) -> Self {
        let buckets: Vec<TokenBucket> = specs.into_iter().map(TokenBucket::new).collect();
        debug_assert!(!buckets.is_empty(), "rate limiter needs at least one bucket");
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Waits until every bucket holds `permits` tokens, then debits all of them at once.
    ///
    /// Returns the smallest number of tokens left in any bucket. A request no bucket
    /// configuration could ever satisfy waits forever.
    pub async fn acquire(&self, permits: u32) -> u32 {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let now = Instant::now();
                buckets.iter_mut().for_each(|bucket| bucket.refill(now));

                if buckets.iter().all(|bucket| bucket.has(permits)) {
                    return buckets
                        .iter_mut()
                        .map(|bucket| bucket.take(permits))
                        .min()
                        .unwrap_or(u32::MAX);
                }

                buckets
                    .iter()
                    .map(|bucket| bucket.time_until(permits))
                    .try_fold(Duration::ZERO, |max, wait| wait.map(|w| max.max(w)))
            };

            match wait {
                Some(wait) => tokio::time::sleep(wait.max(MIN_WAIT)).await,
                None => {
                    warn!(permits, "Rate limiter can never grant this many permits, waiting forever");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    /// Whole tokens currently available in each bucket, in construction order.
    pub async fn available(&self) -> Vec<u32> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets
            .iter_mut()
            .map(|bucket| {
                bucket.refill(now);
                bucket.available()
            })
            .collect()
    }
}

#[async_trait]
impl RateLimit for CompoundRateLimiter {
    async fn acquire(&self, permits: u32) -> u32 {
        CompoundRateLimiter::acquire(self, permits).await
    }
}

/// The provider-tier and default-tier limiters of a scan.
#[derive(Clone)]
pub struct RateLimiters {
    provider_prefix: String,
    provider: Arc<dyn RateLimit>,
    default: Arc<dyn RateLimit>,
}

impl RateLimiters {
    pub fn new(
        provider_prefix: impl Into<String>,
        provider: Arc<dyn RateLimit>,
        default: Arc<dyn RateLimit>,
    ) -> Self {
        Self {
            provider_prefix: provider_prefix.into(),
            provider,
            default,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        let provider = CompoundRateLimiter::new([
            BucketSpec::per_minute(config.ankr_requests_per_minute),
            BucketSpec::per_second(ANKR_REQUESTS_PER_SECOND),
        ]);
        let default =
            CompoundRateLimiter::new([BucketSpec::per_minute(config.default_requests_per_minute)]);

        Self::new(ANKR_URL, Arc::new(provider), Arc::new(default))
    }

    pub fn for_rpc(&self, rpc_url: &str) -> &dyn RateLimit {
        if rpc_url.starts_with(&self.provider_prefix) {
            self.provider.as_ref()
        } else {
            self.default.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::CountingLimiter;
    use futures::future::join_all;

    #[tokio::test(start_paused = true)]
    async fn test_full_bucket_grants_immediately() {
        let limiter = CompoundRateLimiter::new([BucketSpec::per_minute(60)]);
        let start = Instant::now();

        for _ in 0..60 {
            limiter.acquire(1).await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_bucket_waits_for_refill() {
        let limiter = CompoundRateLimiter::new([BucketSpec::per_minute(60)]);
        for _ in 0..60 {
            limiter.acquire(1).await;
        }

        let start = Instant::now();
        limiter.acquire(1).await;

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_the_slowest_bucket() {
        // the first bucket has plenty left, the second runs dry after two permits
        let limiter = CompoundRateLimiter::new([
            BucketSpec::new(5, Duration::from_secs(1)),
            BucketSpec::new(2, Duration::from_secs(10)),
        ]);
        limiter.acquire(1).await;
        limiter.acquire(1).await;

        let start = Instant::now();
        limiter.acquire(1).await;

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_acquire_debits_nothing() {
        let limiter = CompoundRateLimiter::new([
            BucketSpec::new(3, Duration::from_secs(3)),
            BucketSpec::new(1, Duration::from_secs(100)),
        ]);
        assert_eq!(limiter.acquire(1).await, 0);

        let blocked = tokio::time::timeout(Duration::from_secs(50), limiter.acquire(1)).await;
        assert!(blocked.is_err());

        // first bucket refilled to capacity and was never charged for the blocked call
        assert_eq!(limiter.available().await, vec![3, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_permit_acquire() {
        let limiter = CompoundRateLimiter::new([
            BucketSpec::new(10, Duration::from_secs(10)),
            BucketSpec::new(4, Duration::from_secs(4)),
        ]);
        assert_eq!(limiter.acquire(3).await, 1);

        let start = Instant::now();
        assert_eq!(limiter.acquire(3).await, 0);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(limiter.available().await, vec![6, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsatisfiable_request_stalls() {
        let limiter = CompoundRateLimiter::new([BucketSpec::per_second(5)]);
        let result = tokio::time::timeout(Duration::from_secs(3600), limiter.acquire(6)).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_share_the_budget() {
        let limiter = CompoundRateLimiter::new([BucketSpec::new(2, Duration::from_secs(2))]);
        let start = Instant::now();

        join_all((0..6).map(|_| limiter.acquire(1))).await;

        // 2 up front, then one per second
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_selection_by_url_prefix() {
        let provider = Arc::new(CountingLimiter::default());
        let default = Arc::new(CountingLimiter::default());
        let limiters = RateLimiters::new(ANKR_URL, provider.clone(), default.clone());

        limiters.for_rpc("https://rpc.ankr.com/eth/key").acquire(1).await;
        limiters.for_rpc("https://rpc.ankr.com/bsc").acquire(1).await;
        limiters.for_rpc("https://mainnet.infura.io/v3/x").acquire(1).await;
        limiters.for_rpc("http://localhost:8545/rpc.ankr.com").acquire(1).await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(default.calls(), 2);
    }
}
