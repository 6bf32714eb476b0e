//! Reconnection Policy
//!
//! Bounded, observable retry gating for the feed connection. Ordinary
//! transport failures reconnect after a short fixed delay; once the retry
//! counter reaches `max_retries` the policy defers further attempts until
//! the cool-down window has elapsed since the last attempt, then resets the
//! counter. An explicit rate-limit signal from the provider uses a longer,
//! distinct cool-down.
//!
//! Delays are computed against the tokio clock so the policy is testable
//! under a paused runtime.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Why the previous connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Socket closed, timed out, or failed - the standard backoff applies.
    Transport,
    /// The provider signalled throttling - the extended cool-down applies.
    RateLimit,
}

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before a reconnect attempt after a transport failure.
    pub reconnect_delay: Duration,
    /// Delay before a reconnect attempt after a rate-limit signal.
    pub rate_limit_cool_down: Duration,
    /// Consecutive failed attempts allowed before the cool-down gate.
    pub max_retries: u32,
    /// Window that must elapse after the gate closes before attempts resume.
    pub cool_down: Duration,
    /// Jitter factor as a fraction (e.g. 0.1 = +/-10% randomization).
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            rate_limit_cool_down: Duration::from_secs(2),
            max_retries: 3,
            cool_down: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }
}

/// Reconnection policy with an observable retry counter.
///
/// # Example
///
/// ```rust
/// use finnhub_stream_collector::infrastructure::finnhub::reconnect::{
///     DisconnectCause, ReconnectConfig, ReconnectPolicy,
/// };
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
/// let delay = policy.next_delay(DisconnectCause::Transport);
/// assert!(delay >= policy.config().reconnect_delay / 2);
///
/// // A successful connection resets the counter.
/// policy.reset();
/// assert_eq!(policy.retry_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    retry_count: u32,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    /// Create a new policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            retry_count: 0,
            last_attempt: None,
        }
    }

    /// Compute how long to wait before the next connection attempt, record
    /// the attempt, and advance the retry counter.
    ///
    /// Reconnection never gives up: when the retry budget is exhausted the
    /// returned delay stretches to cover the remaining cool-down and the
    /// counter restarts.
    pub fn next_delay(&mut self, cause: DisconnectCause) -> Duration {
        let base = match cause {
            DisconnectCause::Transport => self.config.reconnect_delay,
            DisconnectCause::RateLimit => self.config.rate_limit_cool_down,
        };

        let mut delay = base;
        if self.retry_count >= self.config.max_retries {
            if let Some(at) = self.last_attempt {
                let since = at.elapsed();
                if since < self.config.cool_down {
                    delay = delay.max(self.config.cool_down - since);
                }
            }
            // Cool-down gate applied; the counter starts over.
            self.retry_count = 0;
        }

        self.retry_count += 1;
        self.last_attempt = Some(Instant::now() + delay);

        self.apply_jitter(delay)
    }

    /// Reset the counter after a successful connection.
    pub const fn reset(&mut self) {
        self.retry_count = 0;
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// The configured policy parameters.
    #[must_use]
    pub const fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}
