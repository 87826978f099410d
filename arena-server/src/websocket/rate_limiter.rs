use std::time::{Duration, Instant};

/// Token-bucket limiter for inbound socket messages. Each connection
/// owns one; the bucket refills one token per interval.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    capacity: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(30, Duration::from_secs(2))
    }

    pub fn with_limits(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    /// Take one token if available.
    pub fn allow(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_interval {
            let refilled = (elapsed.as_secs() / self.refill_interval.as_secs().max(1)) as u32;
            self.tokens = (self.tokens + refilled).min(self.capacity);
            self.last_refill = Instant::now();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_exhausts_at_capacity() {
        let mut limiter = RateLimiter::with_limits(3, Duration::from_secs(60));

        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn test_bucket_refills_after_interval() {
        let mut limiter = RateLimiter::with_limits(1, Duration::from_millis(1));

        assert!(limiter.allow());
        std::thread::sleep(Duration::from_millis(1100));
        assert!(limiter.allow());
    }
}
