//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Bounded trade buffer with timed and size-triggered flushing.
pub mod buffer;

/// Configuration loading and validation.
pub mod config;

/// Finnhub WebSocket client adapter.
pub mod finnhub;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Sliding-window rate limiter for outbound requests.
pub mod ratelimit;

/// Trade store adapters.
pub mod storage;

/// OpenTelemetry tracing integration.
pub mod telemetry;
