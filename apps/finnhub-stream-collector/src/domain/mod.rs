//! Domain Layer - Core trade ingestion types and sampling logic.
//!
//! This layer contains the core domain types for trade feed collection.
//! All types here are pure Rust with serialization support.

/// Connection lifecycle states.
pub mod connection;

/// Per-window, per-symbol sampling gate.
pub mod sync_window;

/// Trade event types.
pub mod trade;
