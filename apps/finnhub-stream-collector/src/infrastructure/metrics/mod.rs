//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Trades**: Counts of ticks received, sampled, dropped, and stored
//! - **Connection**: Feed connection state and reconnection attempts
//! - **Buffer**: Current buffer depth and flush outcomes
//! - **Errors**: WebSocket and frame parse failures

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::connection::ConnectionState;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Idempotent; repeated calls return the already-installed handle.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Trade counters
    describe_counter!(
        "finnhub_collector_trades_received_total",
        "Total trade ticks received from the feed"
    );
    describe_counter!(
        "finnhub_collector_trades_sampled_total",
        "Total trade ticks accepted by the sync window and buffered"
    );
    describe_counter!(
        "finnhub_collector_trades_dropped_total",
        "Total trade ticks dropped because the buffer was full"
    );
    describe_counter!(
        "finnhub_collector_inserts_total",
        "Total storage insert attempts by outcome"
    );

    // Connection gauges and counters
    describe_gauge!(
        "finnhub_collector_connection_state",
        "Feed connection state (0=disconnected 1=connecting 2=connected 3=degraded)"
    );
    describe_counter!(
        "finnhub_collector_reconnects_total",
        "Total feed reconnection attempts"
    );

    // Buffer gauge
    describe_gauge!(
        "finnhub_collector_buffer_depth",
        "Number of trades currently held in the flush buffer"
    );

    // Error counters
    describe_counter!(
        "finnhub_collector_websocket_errors_total",
        "Total WebSocket errors by type"
    );
    describe_counter!(
        "finnhub_collector_parse_errors_total",
        "Total inbound frames or ticks skipped as unparseable"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record trade ticks received from the feed.
pub fn record_trades_received(count: u64) {
    counter!("finnhub_collector_trades_received_total").increment(count);
}

/// Record a trade tick accepted by the sync window and buffered.
pub fn record_trade_sampled() {
    counter!("finnhub_collector_trades_sampled_total").increment(1);
}

/// Record a trade tick dropped because the buffer was full.
pub fn record_trade_dropped() {
    counter!("finnhub_collector_trades_dropped_total").increment(1);
}

/// Record a successful storage insert.
pub fn record_insert_ok() {
    counter!(
        "finnhub_collector_inserts_total",
        "outcome" => "ok"
    )
    .increment(1);
}

/// Record a failed storage insert.
pub fn record_insert_failed() {
    counter!(
        "finnhub_collector_inserts_total",
        "outcome" => "failed"
    )
    .increment(1);
}

/// Update the feed connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    let value = match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
        ConnectionState::Degraded => 3.0,
    };
    gauge!("finnhub_collector_connection_state").set(value);
}

/// Record a feed reconnection attempt.
pub fn record_reconnect() {
    counter!("finnhub_collector_reconnects_total").increment(1);
}

/// Update the buffer depth gauge.
pub fn set_buffer_depth(depth: f64) {
    gauge!("finnhub_collector_buffer_depth").set(depth);
}

/// Record a WebSocket error.
pub fn record_websocket_error(error_type: &str) {
    counter!(
        "finnhub_collector_websocket_errors_total",
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record a skipped unparseable frame or tick.
pub fn record_parse_error() {
    counter!("finnhub_collector_parse_errors_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
