//! Configuration Module
//!
//! Configuration loading and validation for the collector service.

mod settings;

pub use settings::{
    BufferSettings, CollectorConfig, ConfigError, Credentials, DEFAULT_SYMBOLS, RateLimitSettings,
    StreamSettings, SyncSettings, parse_symbols,
};
