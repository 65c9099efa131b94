//! Per-parameter send throttling.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Minimum interval between sends, tracked per parameter index.
///
/// A send inside the window is suppressed outright; nothing is queued.
pub struct RateLimiter {
    interval: Duration,
    last_sent: Vec<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration, slots: usize) -> Self {
        Self {
            interval,
            last_sent: vec![None; slots],
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[inline]
    pub fn slots(&self) -> usize {
        self.last_sent.len()
    }

    /// Claim a send slot for `index`. Returns `false` if the last send was too recent.
    pub fn check(&mut self, index: usize, now: Instant) -> Result<bool> {
        let slot = self
            .last_sent
            .get_mut(index)
            .ok_or(Error::InvalidParameter(index))?;

        if let Some(last) = *slot {
            if now.saturating_duration_since(last) < self.interval {
                return Ok(false);
            }
        }
        *slot = Some(now);
        Ok(true)
    }

    /// Whether a send for `index` would be allowed, without claiming it.
    pub fn would_allow(&self, index: usize, now: Instant) -> bool {
        match self.last_sent.get(index) {
            Some(Some(last)) => now.saturating_duration_since(*last) >= self.interval,
            Some(None) => true,
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.last_sent.fill(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppresses_inside_window() {
        let t0 = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_millis(10), 4);

        assert!(limiter.check(2, t0).unwrap());
        assert!(!limiter.check(2, t0 + Duration::from_millis(9)).unwrap());
        assert!(limiter.check(2, t0 + Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_suppressed_attempt_does_not_extend_window() {
        let t0 = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_millis(10), 1);

        limiter.check(0, t0).unwrap();
        limiter.check(0, t0 + Duration::from_millis(8)).unwrap();
        assert!(limiter.would_allow(0, t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_slots_are_independent() {
        let t0 = Instant::now();
        let mut limiter = RateLimiter::new(Duration::from_millis(10), 2);

        assert!(limiter.check(0, t0).unwrap());
        assert!(limiter.check(1, t0).unwrap());
        limiter.reset();
        assert!(limiter.check(0, t0).unwrap());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut limiter = RateLimiter::new(Duration::from_millis(10), 2);
        assert_eq!(
            limiter.check(2, Instant::now()),
            Err(Error::InvalidParameter(2))
        );
        assert!(!limiter.would_allow(5, Instant::now()));
    }
}
