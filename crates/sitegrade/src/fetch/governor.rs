//! Engine-wide ceiling on outbound requests, shared by concurrent audits.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of requests in flight across all audits.
pub const DEFAULT_GLOBAL_CEILING: usize = 32;

/// Limits total in-flight requests and keeps simple counters.
#[derive(Debug)]
pub struct FetchGovernor {
    semaphore: Arc<Semaphore>,
    ceiling: usize,
    in_flight: Arc<AtomicUsize>,
    total_requests: AtomicU64,
}

impl FetchGovernor {
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(ceiling)),
            ceiling,
            in_flight: Arc::new(AtomicUsize::new(0)),
            total_requests: AtomicU64::new(0),
        }
    }

    /// Wait for a global request slot.
    pub async fn acquire(&self) -> GovernorPermit {
        let permit = self.semaphore.clone().acquire_owned().await.ok();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        GovernorPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Requests issued since the governor was created.
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }
}

impl Default for FetchGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL_CEILING)
    }
}

/// Held for the duration of one request.
pub struct GovernorPermit {
    _permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GovernorPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_counts_in_flight() {
        let governor = FetchGovernor::new(2);
        let a = governor.acquire().await;
        let b = governor.acquire().await;
        assert_eq!(governor.in_flight(), 2);
        drop(a);
        assert_eq!(governor.in_flight(), 1);
        drop(b);
        assert_eq!(governor.in_flight(), 0);
        assert_eq!(governor.total_requests(), 2);
    }

    #[tokio::test]
    async fn test_ceiling_blocks() {
        let governor = FetchGovernor::new(1);
        let _held = governor.acquire().await;
        let second = tokio::time::timeout(Duration::from_millis(50), governor.acquire()).await;
        assert!(second.is_err());
    }

    #[test]
    fn test_zero_ceiling_is_raised() {
        assert_eq!(FetchGovernor::new(0).ceiling(), 1);
        assert_eq!(FetchGovernor::default().ceiling(), DEFAULT_GLOBAL_CEILING);
    }
}
