#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Finnhub Stream Collector - Resilient Trade Feed Ingestion
//!
//! Maintains a persistent WebSocket subscription to Finnhub's real-time
//! trade feed, samples at most one update per symbol per sync window, and
//! flushes buffered trades to a downstream store under rate-limit
//! admission.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types with no external integrations
//!   - `trade`: Sampled trade events
//!   - `sync_window`: Per-window per-symbol sampling
//!   - `connection`: Feed connection states
//!
//! - **Application**: Port definitions
//!   - `ports`: The storage sink contract
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: WebSocket client, heartbeat, reconnect policy
//!   - `buffer`: Bounded trade buffer with timed and size flushing
//!   - `ratelimit`: Sliding-window admission for outbound requests
//!   - `storage`: Trade store adapters
//!   - `config`: Environment configuration
//!   - `metrics` / `telemetry`: Prometheus and OpenTelemetry wiring
//!
//! # Data Flow
//!
//! ```text
//! Finnhub WS ──► sync window ──► trade buffer ──► rate limiter ──► store
//!    │ (reconnect + heartbeat)       │ (timed / size flush)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::ConnectionState;
pub use domain::sync_window::{SyncWindowCollector, SyncWindowConfig};
pub use domain::trade::TradeEvent;

// Application ports
pub use application::ports::{StorageError, TradeStore};

// Infrastructure config
pub use infrastructure::config::{
    BufferSettings, CollectorConfig, ConfigError, Credentials, RateLimitSettings, StreamSettings,
    SyncSettings,
};

// Feed client (for integration tests)
pub use infrastructure::finnhub::{
    FeedClient, FeedClientConfig, FeedClientError, FeedEvent, HeartbeatConfig, ReconnectConfig,
};

// Buffer and rate limiter (for integration tests)
pub use infrastructure::buffer::{BufferConfig, BufferMonitor, TradeBuffer};
pub use infrastructure::ratelimit::{RateLimitError, RateLimiter};

// Storage adapters
pub use infrastructure::storage::{MemoryTradeStore, TracingTradeStore};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
