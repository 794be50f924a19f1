//! Per-host request spacing.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep_until;

/// Spaces out requests to the same host by at least `min_delay`.
///
/// Each caller reserves the next free slot for its host before sleeping, so
/// concurrent imports hitting one site queue up instead of bursting.
pub struct RateLimiter {
    min_delay: Duration,
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Wait until a request to `host` is allowed.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let slot = {
            let mut entry = self.next_slot.entry(host.to_string()).or_insert(now);
            let slot = (*entry).max(now);
            *entry = slot + self.min_delay;
            slot
        };

        if slot > now {
            sleep_until(slot.into()).await;
        }
    }

    /// Number of hosts seen so far.
    pub fn tracked_hosts(&self) -> usize {
        self.next_slot.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_delay_never_tracks() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.wait("a.test").await;
        assert_eq!(limiter.tracked_hosts(), 0);
    }

    #[tokio::test]
    async fn test_second_request_to_same_host_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait("a.test").await;
        limiter.wait("b.test").await;
        assert!(start.elapsed() < Duration::from_millis(50));

        limiter.wait("a.test").await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(limiter.tracked_hosts(), 2);
    }
}
