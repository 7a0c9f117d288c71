//! Token bucket used to keep the client under the API's request quota.
//!
//! The bucket starts full. Refill happens in whole units: with
//! [`RefillStrategy::Intervally`] a unit is the full period and restores the
//! whole capacity, with [`RefillStrategy::Greedy`] a unit is
//! `period / capacity` (rounded up to whole nanoseconds) and restores a
//! single token. Time comes from `tokio::time` so tests can run against a
//! paused clock.

use crate::domain::model::{Bandwidth, RefillStrategy};
use crate::utils::error::{CrptError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Outcome of a single consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionProbe {
    pub consumed: bool,
    pub remaining_tokens: u64,
    /// Zero when consumed, otherwise the time until enough tokens exist.
    pub wait_for_refill: Duration,
}

#[derive(Debug)]
pub struct TokenBucket {
    capacity: u64,
    available: u64,
    unit_period: Duration,
    tokens_per_unit: u64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(bandwidth: Bandwidth, now: Instant) -> Result<Self> {
        if bandwidth.capacity == 0 {
            return Err(CrptError::ValidationError {
                message: "rate limit capacity must be at least 1".to_string(),
            });
        }
        if bandwidth.refill_period.is_zero() {
            return Err(CrptError::ValidationError {
                message: "rate limit refill period must be positive".to_string(),
            });
        }

        let (unit_period, tokens_per_unit) = match bandwidth.strategy {
            RefillStrategy::Intervally => (bandwidth.refill_period, bandwidth.capacity),
            RefillStrategy::Greedy => {
                // Rounded up so the long-run rate never exceeds capacity per period.
                let nanos = bandwidth
                    .refill_period
                    .as_nanos()
                    .div_ceil(u128::from(bandwidth.capacity));
                (Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)), 1)
            }
        };

        Ok(Self {
            capacity: bandwidth.capacity,
            available: bandwidth.capacity,
            unit_period,
            tokens_per_unit,
            last_refill: now,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Consumes `tokens` if available. A request above capacity never succeeds.
    pub fn try_consume(&mut self, tokens: u64, now: Instant) -> ConsumptionProbe {
        self.refill(now);

        if tokens <= self.available {
            self.available -= tokens;
            return ConsumptionProbe {
                consumed: true,
                remaining_tokens: self.available,
                wait_for_refill: Duration::ZERO,
            };
        }

        let units_needed = (tokens - self.available).div_ceil(self.tokens_per_unit);
        let since_refill = now.saturating_duration_since(self.last_refill).as_nanos();
        let wait_nanos = (u128::from(units_needed) * self.unit_period.as_nanos())
            .saturating_sub(since_refill);

        ConsumptionProbe {
            consumed: false,
            remaining_tokens: self.available,
            wait_for_refill: Duration::from_nanos(u64::try_from(wait_nanos).unwrap_or(u64::MAX)),
        }
    }

    pub fn available(&mut self, now: Instant) -> u64 {
        self.refill(now);
        self.available
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let unit = self.unit_period.as_nanos();
        let units = elapsed / unit;
        if units == 0 {
            return;
        }

        let added = units.saturating_mul(u128::from(self.tokens_per_unit));
        self.available = (u128::from(self.available) + added).min(u128::from(self.capacity)) as u64;
        // Only whole units are credited so the partial unit keeps counting.
        self.last_refill += Duration::from_nanos(u64::try_from(units * unit).unwrap_or(u64::MAX));
    }
}

/// Shared limiter. Clones draw from the same bucket.
///
/// [`acquire`](RateLimiter::acquire) suspends the caller until a token is
/// available. Waiters are served in arrival order. Dropping a pending
/// `acquire` consumes nothing.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
    waiters: Arc<tokio::sync::Mutex<()>>,
    bandwidth: Bandwidth,
}

impl RateLimiter {
    pub fn new(bandwidth: Bandwidth) -> Result<Self> {
        let bucket = TokenBucket::new(bandwidth, Instant::now())?;
        Ok(Self {
            bucket: Arc::new(Mutex::new(bucket)),
            waiters: Arc::new(tokio::sync::Mutex::new(())),
            bandwidth,
        })
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    fn bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes one token if one is available right now. Does not queue.
    pub fn try_acquire(&self) -> ConsumptionProbe {
        self.bucket().try_consume(1, Instant::now())
    }

    /// Waits for one token and returns how many are left.
    pub async fn acquire(&self) -> u64 {
        self.acquire_tokens(1).await
    }

    pub async fn acquire_many(&self, tokens: u64) -> Result<u64> {
        if tokens > self.bandwidth.capacity {
            return Err(CrptError::ValidationError {
                message: format!(
                    "cannot acquire {} tokens from a bucket with capacity {}",
                    tokens, self.bandwidth.capacity
                ),
            });
        }
        Ok(self.acquire_tokens(tokens).await)
    }

    pub fn available_tokens(&self) -> u64 {
        self.bucket().available(Instant::now())
    }

    async fn acquire_tokens(&self, tokens: u64) -> u64 {
        let _turn = self.waiters.lock().await;

        loop {
            let probe = self.bucket().try_consume(tokens, Instant::now());

            if probe.consumed {
                tracing::debug!("Rate limit token acquired, remaining: {}", probe.remaining_tokens);
                return probe.remaining_tokens;
            }

            tracing::debug!(
                "Rate limit reached, waiting {} ms for refill",
                probe.wait_for_refill.as_millis()
            );
            sleep(probe.wait_for_refill).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_intervally_bucket_drains_and_restores_whole_capacity() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(Bandwidth::intervally(4, secs(3)), t0).unwrap();

        for expected in (0..4).rev() {
            let probe = bucket.try_consume(1, t0);
            assert!(probe.consumed);
            assert_eq!(probe.remaining_tokens, expected);
        }

        let probe = bucket.try_consume(1, t0);
        assert!(!probe.consumed);
        assert_eq!(probe.wait_for_refill, secs(3));

        // Nothing trickles back mid-period.
        let mid = t0 + Duration::from_millis(1500);
        assert_eq!(bucket.available(mid), 0);
        let probe = bucket.try_consume(1, t0 + Duration::from_millis(2900));
        assert_eq!(probe.wait_for_refill, Duration::from_millis(100));

        let probe = bucket.try_consume(1, t0 + secs(3));
        assert!(probe.consumed);
        assert_eq!(probe.remaining_tokens, 3);
    }

    #[test]
    fn test_greedy_bucket_restores_one_token_per_unit() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(Bandwidth::greedy(4, secs(4)), t0).unwrap();
        assert!(bucket.try_consume(4, t0).consumed);

        let t1 = t0 + Duration::from_millis(1500);
        let probe = bucket.try_consume(1, t1);
        assert!(probe.consumed);
        assert_eq!(probe.remaining_tokens, 0);

        let probe = bucket.try_consume(1, t1);
        assert!(!probe.consumed);
        assert_eq!(probe.wait_for_refill, Duration::from_millis(500));
    }

    #[test]
    fn test_idle_bucket_never_exceeds_capacity() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(Bandwidth::intervally(4, secs(3)), t0).unwrap();
        bucket.try_consume(2, t0);

        assert_eq!(bucket.available(t0 + secs(3600)), 4);
        assert!(!bucket.try_consume(5, t0 + secs(3600)).consumed);
    }

    #[test]
    fn test_multi_token_wait_covers_every_missing_unit() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(Bandwidth::greedy(10, secs(10)), t0).unwrap();
        assert!(bucket.try_consume(10, t0).consumed);

        let probe = bucket.try_consume(3, t0 + Duration::from_millis(250));
        assert!(!probe.consumed);
        assert_eq!(probe.wait_for_refill, Duration::from_millis(2750));
    }

    #[test]
    fn test_invalid_bandwidth_is_rejected() {
        let now = Instant::now();
        assert!(TokenBucket::new(Bandwidth::intervally(0, secs(1)), now).is_err());
        assert!(TokenBucket::new(Bandwidth::intervally(1, Duration::ZERO), now).is_err());
        assert!(TokenBucket::new(Bandwidth::greedy(10, Duration::from_nanos(5)), now).is_ok());
        assert!(TokenBucket::new(Bandwidth::intervally(10, Duration::from_nanos(5)), now).is_ok());
    }

    #[test]
    fn test_greedy_rate_stays_within_quota_over_long_horizon() {
        let t0 = Instant::now();
        for (capacity, period_nanos) in [(3u64, 10u64), (7, 1_000), (4, 4)] {
            let period = Duration::from_nanos(period_nanos);
            let mut bucket = TokenBucket::new(Bandwidth::greedy(capacity, period), t0).unwrap();

            let horizon = period_nanos * 300;
            let mut consumed = 0u64;
            for tick in 0..=horizon {
                while bucket.try_consume(1, t0 + Duration::from_nanos(tick)).consumed {
                    consumed += 1;
                }
            }

            let bound = capacity + horizon * capacity / period_nanos;
            assert!(
                consumed <= bound,
                "greedy({}, {}ns) consumed {} tokens in {}ns, bound is {}",
                capacity,
                period_nanos,
                consumed,
                horizon,
                bound
            );
        }
    }

    #[test]
    fn test_greedy_unit_rounds_up() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(Bandwidth::greedy(7, secs(1)), t0).unwrap();
        assert!(bucket.try_consume(7, t0).consumed);

        let probe = bucket.try_consume(1, t0);
        assert_eq!(probe.wait_for_refill, Duration::from_nanos(142_857_143));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_next_period() {
        let limiter = RateLimiter::new(Bandwidth::intervally(4, secs(3))).unwrap();
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        let remaining = limiter.acquire().await;
        assert_eq!(remaining, 3);
        assert_eq!(start.elapsed(), secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_throttled_per_period() {
        let limiter = RateLimiter::new(Bandwidth::intervally(4, secs(3))).unwrap();
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed().as_secs()
            }));
        }

        let mut finished_at = Vec::new();
        for handle in handles {
            finished_at.push(handle.await.unwrap());
        }
        finished_at.sort_unstable();

        assert_eq!(finished_at, vec![0, 0, 0, 0, 3, 3, 3, 3, 6, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_are_served_in_arrival_order() {
        let limiter = RateLimiter::new(Bandwidth::intervally(1, secs(1))).unwrap();
        assert!(limiter.try_acquire().consumed);

        let start = Instant::now();
        let served = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for id in 0..4u64 {
            let limiter = limiter.clone();
            let served = Arc::clone(&served);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                served.lock().unwrap().push((id, start.elapsed().as_secs()));
            }));
            // Let the task reach the waiter queue before the next one is spawned.
            tokio::task::yield_now().await;
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let served = served.lock().unwrap().clone();
        assert_eq!(served, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_does_not_wait() {
        let limiter = RateLimiter::new(Bandwidth::intervally(1, secs(1))).unwrap();

        assert!(limiter.try_acquire().consumed);
        let probe = limiter.try_acquire();
        assert!(!probe.consumed);
        assert_eq!(probe.wait_for_refill, secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_consumes_nothing() {
        let limiter = RateLimiter::new(Bandwidth::intervally(4, secs(3))).unwrap();
        assert_ok!(limiter.acquire_many(4).await);

        let timed_out = tokio::time::timeout(secs(1), limiter.acquire()).await;
        assert_err!(timed_out);
        assert_eq!(limiter.available_tokens(), 0);

        tokio::time::sleep(secs(2)).await;
        let probe = limiter.try_acquire();
        assert!(probe.consumed);
        assert_eq!(probe.remaining_tokens, 3);
    }

    #[tokio::test]
    async fn test_acquire_many_above_capacity_fails() {
        let limiter = RateLimiter::new(Bandwidth::greedy(5, secs(1))).unwrap();
        assert_err!(limiter.acquire_many(6).await);
        assert_eq!(assert_ok!(limiter.acquire_many(5).await), 0);
    }
}
