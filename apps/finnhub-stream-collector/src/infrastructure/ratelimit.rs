//! Sliding-Window Rate Limiter
//!
//! Admission control shared by the subscribe path and the storage flush
//! path. `wait_if_needed` guarantees that no sliding window of
//! `time_window` length ever observes more than `max_requests` admissions.
//!
//! Timestamps come from the tokio clock, so the blocking behavior is
//! testable under a paused runtime.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Errors from rate limiter construction.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// `max_requests` must be strictly positive.
    #[error("max_requests must be strictly positive")]
    InvalidMaxRequests,

    /// `time_window` must be strictly positive.
    #[error("time_window must be strictly positive")]
    InvalidTimeWindow,
}

/// Sliding-window admission control.
///
/// Safe for concurrent callers: the admission log lives behind an async
/// mutex, and the lock is released while a caller sleeps so other tasks
/// are not starved.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a rate limiter.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] if `max_requests` is zero or
    /// `time_window` is zero.
    pub fn new(max_requests: usize, time_window: Duration) -> Result<Self, RateLimitError> {
        if max_requests == 0 {
            return Err(RateLimitError::InvalidMaxRequests);
        }
        if time_window.is_zero() {
            return Err(RateLimitError::InvalidTimeWindow);
        }

        Ok(Self {
            max_requests,
            time_window,
            admissions: Mutex::new(VecDeque::with_capacity(max_requests)),
        })
    }

    /// Block until a new admission fits inside the sliding window, then
    /// record it.
    pub async fn wait_if_needed(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock().await;
                let now = Instant::now();

                Self::evict_expired(&mut admissions, now, self.time_window);

                if admissions.len() < self.max_requests {
                    admissions.push_back(now);
                    return;
                }

                // Window is full: wait until the oldest admission ages out,
                // then re-check. The lock is dropped during the sleep.
                match admissions.front() {
                    Some(oldest) => (*oldest + self.time_window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            if wait.is_zero() {
                continue;
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of admissions currently inside the window.
    pub async fn admitted(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        Self::evict_expired(&mut admissions, Instant::now(), self.time_window);
        admissions.len()
    }

    fn evict_expired(admissions: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = admissions.front() {
            // An admission exactly `window` old no longer constrains new
            // callers, otherwise a waiter waking at the boundary would spin.
            if now.saturating_duration_since(*oldest) >= window {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_max_requests() {
        let result = RateLimiter::new(0, Duration::from_secs(60));
        assert!(matches!(result, Err(RateLimitError::InvalidMaxRequests)));
    }

    #[test]
    fn rejects_zero_time_window() {
        let result = RateLimiter::new(30, Duration::ZERO);
        assert!(matches!(result, Err(RateLimitError::InvalidTimeWindow)));
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit_without_blocking() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60)).unwrap();

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait_if_needed().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.admitted().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn call_past_limit_blocks_until_oldest_expires() {
        let limiter = RateLimiter::new(20, Duration::from_secs(60)).unwrap();

        let start = Instant::now();
        for _ in 0..20 {
            limiter.wait_if_needed().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        // 21st through 25th calls must wait for the first window to age out.
        for _ in 0..5 {
            limiter.wait_if_needed().await;
        }
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(60),
            "expected ~60s block, got {elapsed:?}"
        );
        assert!(
            elapsed < Duration::from_secs(62),
            "expected ~60s block, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_after_expiry() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10)).unwrap();

        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;
        assert_eq!(limiter.admitted().await, 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(limiter.admitted().await, 0);

        let start = Instant::now();
        limiter.wait_if_needed().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn no_window_exceeds_limit_for_concurrent_callers() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(3, Duration::from_secs(5)).unwrap());
        let mut handles = Vec::new();
        for _ in 0..9 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.wait_if_needed().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // Any two admissions three apart must be separated by the window.
        for pair in times.windows(4) {
            let span = pair[3].saturating_duration_since(pair[0]);
            assert!(span >= Duration::from_secs(5), "window violated: {span:?}");
        }
    }
}
