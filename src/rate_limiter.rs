use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::token_bucket::TokenBucket;

/// Process-wide token-bucket admission gate.
///
/// Capacity and refill rate are both the configured requests per second, so the
/// limiter tolerates a burst of one second's quota. A rate of zero denies every call.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    bucket: TokenBucket,
    rejects: u64,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                bucket: TokenBucket::per_second(requests_per_second),
                rejects: 0,
            }),
        }
    }

    /// Take one token if available. Never blocks beyond the internal lock.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    pub(crate) fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if state.bucket.consume_at(1, now) {
            true
        } else {
            state.rejects += 1;
            false
        }
    }

    pub fn rejects(&self) -> u64 {
        self.lock().rejects
    }

    // Every critical section leaves the bucket consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn limiter_at(rate: u32, start: Instant) -> RateLimiter {
        RateLimiter {
            state: Mutex::new(LimiterState {
                bucket: TokenBucket::new_at(rate as f64, rate as f64, start),
                rejects: 0,
            }),
        }
    }

    #[test]
    fn test_allows_within_limit() {
        let start = Instant::now();
        let limiter = limiter_at(10, start);
        for i in 0..10 {
            assert!(limiter.allow_at(start), "request {} should be admitted", i + 1);
        }
        assert_eq!(limiter.rejects(), 0);
    }

    #[test]
    fn test_rejects_over_limit() {
        let start = Instant::now();
        let limiter = limiter_at(5, start);
        for _ in 0..5 {
            assert!(limiter.allow_at(start));
        }
        assert!(!limiter.allow_at(start));
    }

    #[test]
    fn test_refills_over_time() {
        let start = Instant::now();
        let limiter = limiter_at(10, start);
        for _ in 0..10 {
            limiter.allow_at(start);
        }
        assert!(!limiter.allow_at(start));
        assert!(limiter.allow_at(start + Duration::from_millis(150)));
    }

    #[test]
    fn test_tracks_rejects() {
        let start = Instant::now();
        let limiter = limiter_at(2, start);
        limiter.allow_at(start);
        limiter.allow_at(start);
        assert_eq!(limiter.rejects(), 0);

        limiter.allow_at(start);
        limiter.allow_at(start);
        assert_eq!(limiter.rejects(), 2);
    }

    #[test]
    fn test_sustained_rate_is_always_admitted() {
        let start = Instant::now();
        let limiter = limiter_at(4, start);
        // Drain the burst, then call exactly at the refill rate.
        for _ in 0..4 {
            assert!(limiter.allow_at(start));
        }
        for i in 1..=20 {
            assert!(limiter.allow_at(start + Duration::from_millis(250 * i)));
        }
        assert_eq!(limiter.rejects(), 0);
    }

    #[test]
    fn test_zero_rate_denies_permanently() {
        let limiter = RateLimiter::new(0);
        assert!(!limiter.allow());
        assert!(!limiter.allow_at(Instant::now() + Duration::from_secs(3600)));
        assert_eq!(limiter.rejects(), 2);
    }

    #[test]
    fn test_concurrent_callers_never_overdraw() {
        let limiter = Arc::new(RateLimiter::new(50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..20).filter(|_| limiter.allow()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 160 calls against a 50-token bucket; a slow machine may refill a few tokens.
        assert!(admitted >= 50);
        assert!(admitted < 160);
        assert_eq!(limiter.rejects() as usize, 160 - admitted);
    }
}
