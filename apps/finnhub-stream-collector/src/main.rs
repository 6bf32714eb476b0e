//! Finnhub Stream Collector Binary
//!
//! Starts the trade feed collector.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin finnhub-stream-collector
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FINNHUB_API_KEY`: Finnhub API token
//!
//! ## Optional
//! - `FINNHUB_SYMBOLS`: Comma-separated symbols (default: 10 large caps)
//! - `COLLECTOR_SYNC_INTERVAL_SECS`: Sync window length (default: 3)
//! - `COLLECTOR_BUFFER_CAPACITY`: Buffer capacity (default: 100)
//! - `COLLECTOR_BUFFER_FLUSH_TIMEOUT_SECS`: Flush timeout (default: 5)
//! - `COLLECTOR_RATE_LIMIT_MAX_REQUESTS`: Requests per window (default: 30)
//! - `COLLECTOR_RATE_LIMIT_WINDOW_SECS`: Rate-limit window (default: 60)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: finnhub-stream-collector)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use finnhub_stream_collector::infrastructure::buffer::{BufferConfig, BufferMonitor, TradeBuffer};
use finnhub_stream_collector::infrastructure::finnhub::{
    FeedClient, FeedClientConfig, FeedEvent, HeartbeatConfig, ReconnectConfig,
};
use finnhub_stream_collector::infrastructure::ratelimit::RateLimiter;
use finnhub_stream_collector::infrastructure::storage::TracingTradeStore;
use finnhub_stream_collector::infrastructure::telemetry;
use finnhub_stream_collector::{CollectorConfig, SyncWindowConfig, init_metrics};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout, covering the final buffer flush.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Finnhub Stream Collector");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = CollectorConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Shared rate limiter: subscriptions and storage writes draw from the
    // same admission budget.
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.time_window,
    )?);

    let buffer = Arc::new(TradeBuffer::new(config.buffer.capacity));
    let store = Arc::new(TracingTradeStore::new());

    // Buffer monitor performs a final flush when the token fires.
    let monitor = BufferMonitor::new(
        BufferConfig {
            capacity: config.buffer.capacity,
            flush_timeout: config.buffer.flush_timeout,
            poll_interval: config.buffer.poll_interval,
        },
        Arc::clone(&buffer),
        Arc::clone(&limiter),
        store,
        shutdown_token.clone(),
    );
    let monitor_handle = tokio::spawn(monitor.run());

    // Feed client
    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(256);
    let client_config = FeedClientConfig {
        url: config.stream_url(),
        symbols: config.symbols.clone(),
        reconnect: ReconnectConfig {
            reconnect_delay: config.stream.reconnect_delay,
            rate_limit_cool_down: config.stream.rate_limit_cool_down,
            max_retries: config.stream.max_retries,
            cool_down: config.stream.cool_down,
            ..ReconnectConfig::default()
        },
        heartbeat: HeartbeatConfig {
            ping_interval: config.stream.ping_interval,
            pong_timeout: config.stream.pong_timeout,
            max_misses: config.stream.max_misses,
        },
        sync_window: SyncWindowConfig {
            interval: config.sync.interval,
            tolerance: config.sync.tolerance,
        },
    };
    let client = Arc::new(FeedClient::new(
        client_config,
        Arc::clone(&buffer),
        Arc::clone(&limiter),
        event_tx,
        shutdown_token.clone(),
    ));

    tokio::spawn(handle_feed_events(event_rx));
    let client_handle = tokio::spawn(Arc::clone(&client).run());

    tracing::info!("Collector ready");

    await_shutdown(shutdown_token).await;

    // Let the client stop producing, then wait for the monitor's final
    // flush before exiting.
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, client_handle).await;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, monitor_handle)
        .await
        .is_err()
    {
        tracing::warn!("Final buffer flush did not finish before the shutdown timeout");
    }

    tracing::info!("Collector stopped");
    Ok(())
}

/// Handle lifecycle events from the feed client.
async fn handle_feed_events(mut rx: mpsc::Receiver<FeedEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Connected { symbols } => {
                tracing::info!(symbols, "Trade feed connected");
            }
            FeedEvent::Disconnected => {
                tracing::warn!("Trade feed disconnected");
            }
            FeedEvent::Degraded { misses } => {
                tracing::warn!(misses, "Trade feed degraded, pongs overdue");
            }
            FeedEvent::Reconnecting { attempt } => {
                tracing::info!(attempt, "Trade feed reconnecting");
            }
            FeedEvent::Error(msg) => {
                tracing::error!(error = %msg, "Trade feed error");
            }
        }
    }
}

/// Load .env file from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &CollectorConfig) {
    tracing::info!(
        symbols = config.symbols.len(),
        sync_interval_secs = config.sync.interval.as_secs(),
        buffer_capacity = config.buffer.capacity,
        flush_timeout_secs = config.buffer.flush_timeout.as_secs(),
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.time_window.as_secs(),
        "Configuration loaded"
    );
    tracing::debug!(symbols = ?config.symbols, "Tracked symbols");
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
