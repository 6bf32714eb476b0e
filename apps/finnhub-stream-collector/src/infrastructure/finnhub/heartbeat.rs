//! Heartbeat Manager
//!
//! Liveness detection for the feed connection via protocol ping/pong
//! round-trips. A periodic check compares `now - last_pong` against the
//! pong timeout; each exceedance counts as a miss, and after a configured
//! number of consecutive misses the connection is declared dead so the
//! client force-closes the socket and reconnects.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between ping messages and liveness checks.
    pub ping_interval: Duration,
    /// Age of the last pong beyond which a check counts as a miss.
    pub pong_timeout: Duration,
    /// Consecutive misses before the connection is declared dead.
    pub max_misses: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(3),
            max_misses: 2,
        }
    }
}

/// Events emitted by the heartbeat manager.
#[derive(Debug, Clone)]
pub enum HeartbeatEvent {
    /// Request to send a ping frame.
    SendPing,
    /// A liveness check missed; the connection may be degrading.
    Miss {
        /// Consecutive misses so far.
        count: u32,
    },
    /// Too many consecutive misses; the connection should be restarted.
    Dead,
}

/// State shared between the heartbeat manager and the read loop.
///
/// The read loop records pongs; the manager only reads.
#[derive(Debug)]
pub struct HeartbeatState {
    last_pong: RwLock<Instant>,
    waiting_for_pong: AtomicBool,
    misses: AtomicU32,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create new heartbeat state with the pong clock starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_pong: RwLock::new(Instant::now()),
            waiting_for_pong: AtomicBool::new(false),
            misses: AtomicU32::new(0),
        }
    }

    /// Record that a pong was received. Clears the miss counter.
    pub fn record_pong(&self) {
        *self.last_pong.write() = Instant::now();
        self.waiting_for_pong.store(false, Ordering::SeqCst);
        self.misses.store(0, Ordering::SeqCst);
    }

    /// Mark that a ping was sent and a pong is now expected.
    pub fn mark_ping_sent(&self) {
        self.waiting_for_pong.store(true, Ordering::SeqCst);
    }

    /// Whether a pong is currently outstanding.
    #[must_use]
    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong.load(Ordering::SeqCst)
    }

    /// Time since the last pong.
    #[must_use]
    pub fn time_since_pong(&self) -> Duration {
        self.last_pong.read().elapsed()
    }

    /// Consecutive misses recorded so far.
    #[must_use]
    pub fn miss_count(&self) -> u32 {
        self.misses.load(Ordering::SeqCst)
    }

    fn record_miss(&self) -> u32 {
        self.misses.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn clear_misses(&self) {
        self.misses.store(0, Ordering::SeqCst);
    }
}

/// Heartbeat manager that monitors connection health.
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    state: Arc<HeartbeatState>,
    event_tx: mpsc::Sender<HeartbeatEvent>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        state: Arc<HeartbeatState>,
        event_tx: mpsc::Sender<HeartbeatEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            state,
            event_tx,
            cancel,
        }
    }

    /// Run the liveness loop until cancelled or the connection is declared
    /// dead.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The immediate first tick would count a miss before any pong could
        // arrive.
        interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Heartbeat manager cancelled");
                    return;
                }
                _ = interval.tick() => {
                    if self.check_and_ping().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Evaluate liveness and request a ping.
    ///
    /// Returns `Err(())` when the connection was declared dead or the
    /// event channel closed.
    async fn check_and_ping(&self) -> Result<(), ()> {
        // A stale pong clock only counts once a ping is actually
        // outstanding, otherwise the first check of a fresh connection
        // would miss before any ping was answered.
        let elapsed = self.state.time_since_pong();
        if self.state.is_waiting_for_pong() && elapsed > self.config.pong_timeout {
            let misses = self.state.record_miss();
            tracing::warn!(
                misses,
                max_misses = self.config.max_misses,
                last_pong_secs = elapsed.as_secs(),
                "Liveness check missed"
            );

            if misses >= self.config.max_misses {
                self.state.clear_misses();
                let _ = self.event_tx.send(HeartbeatEvent::Dead).await;
                return Err(());
            }

            if self
                .event_tx
                .send(HeartbeatEvent::Miss { count: misses })
                .await
                .is_err()
            {
                return Err(());
            }
        }

        if self.event_tx.send(HeartbeatEvent::SendPing).await.is_err() {
            tracing::debug!("Event channel closed, stopping heartbeat");
            return Err(());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(5));
        assert_eq!(config.pong_timeout, Duration::from_secs(3));
        assert_eq!(config.max_misses, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pong_clears_misses_and_outstanding_ping() {
        let state = HeartbeatState::new();
        assert_eq!(state.miss_count(), 0);
        assert!(!state.is_waiting_for_pong());

        state.mark_ping_sent();
        state.record_miss();
        state.record_miss();
        assert!(state.is_waiting_for_pong());
        assert_eq!(state.miss_count(), 2);

        state.record_pong();
        assert!(!state.is_waiting_for_pong());
        assert_eq!(state.miss_count(), 0);
        assert_eq!(state.time_since_pong(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn manager_sends_ping_events() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(50),
            pong_timeout: Duration::from_secs(10),
            max_misses: 2,
        };
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        let event = event_rx.recv().await.unwrap();
        assert!(matches!(event, HeartbeatEvent::SendPing));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn manager_declares_dead_after_max_misses() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(3),
            max_misses: 2,
        };
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        // No pong ever arrives after the first ping: the check at 10s
        // misses (count 1) and the one at 15s declares the connection dead.
        let mut saw_miss = false;
        let mut saw_dead = false;
        while let Some(event) = event_rx.recv().await {
            match event {
                HeartbeatEvent::Miss { count } => {
                    assert_eq!(count, 1);
                    saw_miss = true;
                }
                HeartbeatEvent::Dead => {
                    saw_dead = true;
                    break;
                }
                HeartbeatEvent::SendPing => state.mark_ping_sent(),
            }
        }
        assert!(saw_miss);
        assert!(saw_dead);
        assert_eq!(state.miss_count(), 0, "miss counter resets after dead");

        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn responsive_connection_never_misses() {
        let config = HeartbeatConfig {
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(3),
            max_misses: 2,
        };
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, Arc::clone(&state), event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        // Answer every ping promptly.
        for _ in 0..5 {
            let event = event_rx.recv().await.unwrap();
            assert!(matches!(event, HeartbeatEvent::SendPing), "got {event:?}");
            state.mark_ping_sent();
            state.record_pong();
        }
        assert_eq!(state.miss_count(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn manager_cancellation() {
        let config = HeartbeatConfig::default();
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, _event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let manager = HeartbeatManager::new(config, state, event_tx, cancel.clone());
        let handle = tokio::spawn(manager.run());

        cancel.cancel();
        handle.await.unwrap();
    }
}
