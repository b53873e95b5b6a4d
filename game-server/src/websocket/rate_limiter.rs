use std::time::{Duration, Instant};

/// Token bucket for inbound messages on one connection.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(30, Duration::from_millis(500))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: refill_rate.max(Duration::from_millis(1)),
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let intervals = elapsed.as_millis() / self.refill_rate.as_millis();
        if intervals == 0 {
            return;
        }

        let tokens_to_add = u32::try_from(intervals).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.max_tokens);
        if self.tokens == self.max_tokens {
            self.last_refill = Instant::now();
        } else {
            // Keep the partial interval
            self.last_refill += self.refill_rate * tokens_to_add;
        }
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
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
    fn test_burst_then_blocked() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(60));
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(!limiter.check_rate_limit());
        assert_eq!(limiter.get_remaining_tokens(), 0);
    }

    #[test]
    fn test_refill_after_interval() {
        let mut limiter = RateLimiter::new_with_limits(2, Duration::from_millis(10));
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        assert!(!limiter.check_rate_limit());

        std::thread::sleep(Duration::from_millis(25));
        assert!(limiter.check_rate_limit());
        assert!(limiter.get_remaining_tokens() <= 2);
    }

    #[test]
    fn test_never_exceeds_bucket() {
        let mut limiter = RateLimiter::new_with_limits(5, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.get_remaining_tokens(), 5);
    }
}
