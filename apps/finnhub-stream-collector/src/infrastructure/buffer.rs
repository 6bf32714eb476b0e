//! Bounded Trade Buffer
//!
//! FIFO staging area between the socket read loop and the storage sink.
//! Enqueues are non-blocking: when the buffer is full the event is dropped
//! and logged rather than applying back-pressure to the read loop. This
//! data loss is a deliberate policy, not an accident - the feed samples at
//! most one update per symbol per window, so a full buffer means storage is
//! already far behind and stale ticks are the right thing to shed.
//!
//! A [`BufferMonitor`] task polls on a short cadence and flushes when the
//! buffer is full or the flush timeout has elapsed, whichever comes first.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::TradeStore;
use crate::domain::trade::TradeEvent;
use crate::infrastructure::metrics;
use crate::infrastructure::ratelimit::RateLimiter;

/// Configuration for buffering and flushing.
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    /// Maximum number of buffered trades.
    pub capacity: usize,
    /// Flush even a partially filled buffer after this long.
    pub flush_timeout: Duration,
    /// How often the monitor re-evaluates the flush triggers.
    pub poll_interval: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            flush_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Error returned when the buffer is at capacity.
#[derive(Debug, thiserror::Error)]
#[error("trade buffer full (capacity {capacity})")]
pub struct BufferFullError {
    /// Configured capacity at the time of the rejected enqueue.
    pub capacity: usize,
}

struct BufferInner {
    queue: VecDeque<TradeEvent>,
    last_flush: Instant,
}

/// Bounded FIFO of sampled trades.
///
/// Producers (the read loop) and the consumer (the monitor) share this
/// through an `Arc`; every access goes through a short critical section so
/// an in-progress flush can never block enqueues for long.
pub struct TradeBuffer {
    capacity: usize,
    inner: Mutex<BufferInner>,
}

impl TradeBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(BufferInner {
                queue: VecDeque::with_capacity(capacity),
                last_flush: Instant::now(),
            }),
        }
    }

    /// Append a trade without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`BufferFullError`] when the buffer is at capacity; the
    /// caller logs and drops the event.
    pub fn try_enqueue(&self, event: TradeEvent) -> Result<usize, BufferFullError> {
        let mut inner = self.inner.lock();
        if inner.queue.len() >= self.capacity {
            return Err(BufferFullError {
                capacity: self.capacity,
            });
        }
        inner.queue.push_back(event);
        Ok(inner.queue.len())
    }

    /// Current number of buffered trades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether the buffer holds no trades.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Whether a flush is due: buffer at capacity, or the flush timeout has
    /// elapsed since the last flush.
    #[must_use]
    pub fn should_flush(&self, flush_timeout: Duration) -> bool {
        let inner = self.inner.lock();
        inner.queue.len() >= self.capacity || inner.last_flush.elapsed() >= flush_timeout
    }

    /// Take up to `capacity` trades in FIFO order and restamp the flush
    /// clock. Items are moved out under the lock; the caller processes them
    /// outside it.
    #[must_use]
    pub fn drain(&self) -> Vec<TradeEvent> {
        let mut inner = self.inner.lock();
        let n = inner.queue.len().min(self.capacity);
        let drained = inner.queue.drain(..n).collect();
        inner.last_flush = Instant::now();
        drained
    }
}

/// Periodic task that drains the buffer into the storage port.
///
/// Each drained record passes rate-limit admission before the insert, so a
/// slow store cannot burst past the provider-wide write budget. Insert
/// failures are logged and the record is dropped: ingestion is
/// at-most-once by design, with no retry queue.
pub struct BufferMonitor {
    config: BufferConfig,
    buffer: Arc<TradeBuffer>,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn TradeStore>,
    cancel: CancellationToken,
}

impl BufferMonitor {
    /// Create a new monitor.
    #[must_use]
    pub fn new(
        config: BufferConfig,
        buffer: Arc<TradeBuffer>,
        limiter: Arc<RateLimiter>,
        store: Arc<dyn TradeStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            buffer,
            limiter,
            store,
            cancel,
        }
    }

    /// Run until cancelled, then flush whatever remains so shutdown does
    /// not lose buffered trades.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Buffer monitor cancelled, performing final flush");
                    self.flush().await;
                    return;
                }
                _ = interval.tick() => {
                    if self.buffer.should_flush(self.config.flush_timeout) {
                        self.flush().await;
                    }
                }
            }
        }
    }

    /// Drain the buffer and insert each record through the rate limiter.
    async fn flush(&self) {
        let drained = self.buffer.drain();
        if drained.is_empty() {
            return;
        }

        let total = drained.len();
        let mut stored = 0_usize;
        let mut failed = 0_usize;

        for record in &drained {
            self.limiter.wait_if_needed().await;
            match self.store.insert(record).await {
                Ok(()) => {
                    stored += 1;
                    metrics::record_insert_ok();
                    tracing::debug!(
                        symbol = %record.symbol,
                        price = %record.price,
                        "Stored trade from buffer"
                    );
                }
                Err(e) => {
                    failed += 1;
                    metrics::record_insert_failed();
                    tracing::warn!(
                        symbol = %record.symbol,
                        error = %e,
                        "Dropping trade after failed insert"
                    );
                }
            }
        }

        metrics::set_buffer_depth(self.buffer.len() as f64);
        tracing::info!(total, stored, failed, "Flushed trade buffer");
    }
}
