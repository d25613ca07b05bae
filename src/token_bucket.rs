use std::time::Instant;

/// Continuously refilling token bucket. Not synchronized; callers wrap it in a lock.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new_at(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            capacity,
            tokens: capacity,
            refill_rate: refill_rate.max(0.0),
            last_refill: now,
        }
    }

    /// A bucket that bursts up to one second's worth of requests.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = requests_per_second as f64;
        Self::new_at(rate, rate, Instant::now())
    }

    pub fn consume_at(&mut self, tokens: u32, now: Instant) -> bool {
        self.refill_at(now);

        if self.tokens >= tokens as f64 {
            self.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }

    fn refill_at(&mut self, now: Instant) {
        // A clock reading older than last_refill adds nothing.
        let elapsed = now.saturating_duration_since(self.last_refill);
        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();

        self.tokens = (self.tokens + tokens_to_add).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}
