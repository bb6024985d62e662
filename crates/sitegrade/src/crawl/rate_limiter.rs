//! Per-audit politeness limiter.

use crate::crawl::robots::MAX_CRAWL_DELAY;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Caps concurrent requests to one site and spaces them by a minimum delay.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    /// Limiter whose delay is the larger of the configured politeness delay
    /// and robots.txt `Crawl-delay`, capped at two seconds.
    pub fn with_crawl_delay(
        max_concurrent: usize,
        politeness: Duration,
        crawl_delay: Option<Duration>,
    ) -> Self {
        let delay = crawl_delay.unwrap_or_default().max(politeness);
        Self::new(max_concurrent, delay.min(MAX_CRAWL_DELAY))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait for a slot and for the minimum spacing since the previous request.
    pub async fn acquire(&self) -> RateLimitGuard {
        let permit = self.semaphore.clone().acquire_owned().await.ok();

        if !self.min_delay.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(prev) = *last {
                let elapsed = prev.elapsed();
                if elapsed < self.min_delay {
                    tokio::time::sleep(self.min_delay - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        RateLimitGuard { _permit: permit }
    }
}

/// Releases the limiter slot when dropped.
pub struct RateLimitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(2, Duration::ZERO);
        let _g1 = limiter.acquire().await;
        let _g2 = limiter.acquire().await;
        assert_eq!(limiter.semaphore.available_permits(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        {
            let _g = limiter.acquire().await;
            assert_eq!(limiter.semaphore.available_permits(), 0);
        }
        assert_eq!(limiter.semaphore.available_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_delay_spacing() {
        let limiter = RateLimiter::new(4, Duration::from_millis(500));
        let start = Instant::now();
        drop(limiter.acquire().await);
        drop(limiter.acquire().await);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn test_crawl_delay_capped() {
        let limiter =
            RateLimiter::with_crawl_delay(2, Duration::from_millis(100), Some(Duration::from_secs(9)));
        assert_eq!(limiter.min_delay(), MAX_CRAWL_DELAY);
        let limiter = RateLimiter::with_crawl_delay(2, Duration::from_millis(100), None);
        assert_eq!(limiter.min_delay(), Duration::from_millis(100));
    }
}
