//! Minimum-interval request throttle.
//!
//! Spaces the start of consecutive upstream requests by at least `interval`.
//! The first request is never delayed. Built on `tokio::time`, so tests can
//! drive it with a paused clock.

use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_start: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may start, then mark it started.
    ///
    /// Returns how long the caller was held back.
    pub async fn ready(&mut self) -> Duration {
        let now = Instant::now();
        let waited = match self.last_start.map(|last| last.checked_add(self.interval)) {
            Some(Some(until)) if until > now => {
                sleep_until(until).await;
                until - now
            }
            // Deadline past the clock's range: `sleep` caps it instead of panicking
            Some(None) => {
                sleep(self.interval).await;
                self.interval
            }
            _ => Duration::ZERO,
        };
        self.last_start = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();
        assert_eq!(throttle.ready().await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_calls_are_spaced() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();
        throttle.ready().await;
        throttle.ready().await;
        throttle.ready().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_work_absorbs_the_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        throttle.ready().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(throttle.ready().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_does_not_overflow() {
        let mut throttle = Throttle::new(Duration::MAX);
        assert_eq!(throttle.ready().await, Duration::ZERO);
        assert_eq!(throttle.ready().await, Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let mut throttle = Throttle::new(Duration::ZERO);
        throttle.ready().await;
        assert_eq!(throttle.ready().await, Duration::ZERO);
    }
}
