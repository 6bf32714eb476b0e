//! Collector Pipeline Integration Tests
//!
//! Exercises the buffer-to-store path with a real clock: trades staged in
//! the buffer reach the in-memory store through the monitor under
//! rate-limit admission, and shutdown drains what remains.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use finnhub_stream_collector::infrastructure::buffer::{BufferConfig, BufferMonitor, TradeBuffer};
use finnhub_stream_collector::infrastructure::ratelimit::RateLimiter;
use finnhub_stream_collector::infrastructure::storage::MemoryTradeStore;
use finnhub_stream_collector::{TradeEvent, TradeStore};

fn event(symbol: &str, price: i64) -> TradeEvent {
    let now = Utc::now();
    TradeEvent::new(symbol.to_string(), Decimal::new(price, 2), None, now, now)
}

#[tokio::test]
async fn buffered_trades_reach_the_store() {
    let buffer = Arc::new(TradeBuffer::new(100));
    let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(60)).unwrap());
    let store = Arc::new(MemoryTradeStore::new());
    let cancel = CancellationToken::new();

    let monitor = BufferMonitor::new(
        BufferConfig {
            capacity: 100,
            flush_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(50),
        },
        Arc::clone(&buffer),
        limiter,
        Arc::clone(&store) as Arc<dyn TradeStore>,
        cancel.clone(),
    );
    let handle = tokio::spawn(monitor.run());

    buffer.try_enqueue(event("AAPL", 15025)).unwrap();
    buffer.try_enqueue(event("MSFT", 40050)).unwrap();

    // Timed flush picks both up.
    timeout(Duration::from_secs(5), async {
        while store.len() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let records = store.records();
    assert_eq!(records[0].symbol, "AAPL");
    assert_eq!(records[0].price, Decimal::new(15025, 2));
    assert_eq!(records[1].symbol, "MSFT");

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_flushes_remaining_trades() {
    let buffer = Arc::new(TradeBuffer::new(100));
    let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(60)).unwrap());
    let store = Arc::new(MemoryTradeStore::new());
    let cancel = CancellationToken::new();

    let monitor = BufferMonitor::new(
        BufferConfig {
            capacity: 100,
            // Long timeout: nothing flushes until cancellation.
            flush_timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_millis(50),
        },
        Arc::clone(&buffer),
        limiter,
        Arc::clone(&store) as Arc<dyn TradeStore>,
        cancel.clone(),
    );
    let handle = tokio::spawn(monitor.run());

    for i in 0..5 {
        buffer.try_enqueue(event("TSLA", 20000 + i)).unwrap();
    }

    cancel.cancel();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    assert_eq!(store.len(), 5);
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn capacity_flush_beats_the_timer() {
    let buffer = Arc::new(TradeBuffer::new(3));
    let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(60)).unwrap());
    let store = Arc::new(MemoryTradeStore::new());
    let cancel = CancellationToken::new();

    let monitor = BufferMonitor::new(
        BufferConfig {
            capacity: 3,
            flush_timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_millis(50),
        },
        Arc::clone(&buffer),
        limiter,
        Arc::clone(&store) as Arc<dyn TradeStore>,
        cancel.clone(),
    );
    let handle = tokio::spawn(monitor.run());

    for sym in ["AAPL", "MSFT", "NVDA"] {
        buffer.try_enqueue(event(sym, 10000)).unwrap();
    }

    timeout(Duration::from_secs(5), async {
        while store.len() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    handle.await.unwrap();
}
