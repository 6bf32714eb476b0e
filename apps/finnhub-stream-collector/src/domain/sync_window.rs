//! Sync Window Sampling
//!
//! The feed delivers a continuous firehose of trades. The collector only
//! keeps one update per symbol per fixed window, so downstream storage sees
//! a paced stream instead of every tick.
//!
//! Timing uses the tokio clock, so tests can drive window rollovers with a
//! paused runtime instead of real timers.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

/// Configuration for the sampling window.
#[derive(Debug, Clone, Copy)]
pub struct SyncWindowConfig {
    /// Window length between collection cycles.
    pub interval: Duration,
    /// Jitter allowance subtracted from `interval` when checking rollover,
    /// so windows do not drift behind wall-clock multiples of the interval.
    pub tolerance: Duration,
}

impl Default for SyncWindowConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            tolerance: Duration::from_millis(500),
        }
    }
}

/// Per-interval, per-symbol sampling gate.
///
/// # Example
///
/// ```rust
/// use finnhub_stream_collector::domain::sync_window::{SyncWindowCollector, SyncWindowConfig};
///
/// let mut collector = SyncWindowCollector::new(SyncWindowConfig::default());
/// assert!(collector.should_process("AAPL"));
/// assert!(!collector.should_process("AAPL"));
/// assert!(collector.should_process("MSFT"));
/// ```
#[derive(Debug)]
pub struct SyncWindowCollector {
    config: SyncWindowConfig,
    last_sync: Instant,
    collected: HashSet<String>,
}

impl SyncWindowCollector {
    /// Create a collector with a fresh window starting now.
    #[must_use]
    pub fn new(config: SyncWindowConfig) -> Self {
        Self {
            config,
            last_sync: Instant::now(),
            collected: HashSet::new(),
        }
    }

    /// Decide whether a trade for `symbol` should be kept.
    ///
    /// Returns `true` unconditionally for the first call after a window
    /// rollover; within a window, returns `true` at most once per symbol.
    pub fn should_process(&mut self, symbol: &str) -> bool {
        let elapsed = self.last_sync.elapsed();

        // Rollover: start a new collection cycle. The symbol is recorded so
        // it cannot be sampled a second time within the same window.
        if elapsed >= self.config.interval.saturating_sub(self.config.tolerance) {
            self.collected.clear();
            self.last_sync = Instant::now();
            self.collected.insert(symbol.to_string());
            tracing::debug!(symbol, "Starting new collection cycle");
            return true;
        }

        self.collected.insert(symbol.to_string())
    }

    /// Number of distinct symbols sampled in the current window.
    #[must_use]
    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }
}
