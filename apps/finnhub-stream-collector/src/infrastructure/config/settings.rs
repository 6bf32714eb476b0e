//! Collector Configuration Settings
//!
//! Configuration types for the trade collector, loaded from environment
//! variables. Every setting has a production default; only the API token
//! is required. Validation runs once at startup and a bad value is fatal,
//! there is no partial configuration.

use std::time::Duration;

/// Symbols tracked when `FINNHUB_SYMBOLS` is unset.
pub const DEFAULT_SYMBOLS: [&str; 10] = [
    "AAPL", "MSFT", "AMZN", "GOOGL", "META", "TSLA", "NVDA", "AMD", "INTC", "NFLX",
];

/// Finnhub API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_token: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_token: String) -> Self {
        Self { api_token }
    }

    /// Get the API token.
    #[must_use]
    pub fn api_token(&self) -> &str {
        &self.api_token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Feed connection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Delay before a reconnect attempt after a transport failure.
    pub reconnect_delay: Duration,
    /// Delay before a reconnect attempt after a provider rate-limit signal.
    pub rate_limit_cool_down: Duration,
    /// Consecutive failed attempts allowed before the cool-down gate.
    pub max_retries: u32,
    /// Window that must elapse after the gate closes before attempts resume.
    pub cool_down: Duration,
    /// Interval between liveness pings.
    pub ping_interval: Duration,
    /// Age of the last pong beyond which a check counts as a miss.
    pub pong_timeout: Duration,
    /// Consecutive misses before the connection is force-closed.
    pub max_misses: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            rate_limit_cool_down: Duration::from_secs(2),
            max_retries: 3,
            cool_down: Duration::from_secs(30),
            ping_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(3),
            max_misses: 2,
        }
    }
}

/// Outbound request rate-limit settings.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Maximum admissions per sliding window.
    pub max_requests: usize,
    /// Sliding window length.
    pub time_window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 30,
            time_window: Duration::from_secs(60),
        }
    }
}

/// Sync window sampling settings.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Nominal window length.
    pub interval: Duration,
    /// Early-rollover tolerance subtracted from the interval.
    pub tolerance: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            tolerance: Duration::from_millis(500),
        }
    }
}

/// Trade buffer settings.
#[derive(Debug, Clone)]
pub struct BufferSettings {
    /// Maximum trades held before a flush is forced.
    pub capacity: usize,
    /// Maximum age of buffered trades before a timed flush.
    pub flush_timeout: Duration,
    /// How often the monitor evaluates the flush conditions.
    pub poll_interval: Duration,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            flush_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Complete collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Symbols to subscribe. Fixed for the process lifetime.
    pub symbols: Vec<String>,
    /// Feed connection settings.
    pub stream: StreamSettings,
    /// Rate-limit settings.
    pub rate_limit: RateLimitSettings,
    /// Sync window settings.
    pub sync: SyncSettings,
    /// Buffer settings.
    pub buffer: BufferSettings,
}

impl CollectorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FINNHUB_API_KEY` is missing or empty, or if any
    /// provided value fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("FINNHUB_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("FINNHUB_API_KEY".to_string()))?;

        if api_token.is_empty() {
            return Err(ConfigError::EmptyValue("FINNHUB_API_KEY".to_string()));
        }

        let symbols = std::env::var("FINNHUB_SYMBOLS")
            .map_or_else(|_| default_symbols(), |raw| parse_symbols(&raw));

        let stream = StreamSettings {
            reconnect_delay: parse_env_duration_secs(
                "COLLECTOR_RECONNECT_DELAY_SECS",
                StreamSettings::default().reconnect_delay,
            ),
            rate_limit_cool_down: parse_env_duration_secs(
                "COLLECTOR_RATE_LIMIT_COOL_DOWN_SECS",
                StreamSettings::default().rate_limit_cool_down,
            ),
            max_retries: parse_env_u32(
                "COLLECTOR_MAX_RETRIES",
                StreamSettings::default().max_retries,
            ),
            cool_down: parse_env_duration_secs(
                "COLLECTOR_COOL_DOWN_SECS",
                StreamSettings::default().cool_down,
            ),
            ping_interval: parse_env_duration_secs(
                "COLLECTOR_PING_INTERVAL_SECS",
                StreamSettings::default().ping_interval,
            ),
            pong_timeout: parse_env_duration_secs(
                "COLLECTOR_PONG_TIMEOUT_SECS",
                StreamSettings::default().pong_timeout,
            ),
            max_misses: parse_env_u32(
                "COLLECTOR_MAX_MISSES",
                StreamSettings::default().max_misses,
            ),
        };

        let rate_limit = RateLimitSettings {
            max_requests: parse_env_usize(
                "COLLECTOR_RATE_LIMIT_MAX_REQUESTS",
                RateLimitSettings::default().max_requests,
            ),
            time_window: parse_env_duration_secs(
                "COLLECTOR_RATE_LIMIT_WINDOW_SECS",
                RateLimitSettings::default().time_window,
            ),
        };

        let sync = SyncSettings {
            interval: parse_env_duration_secs(
                "COLLECTOR_SYNC_INTERVAL_SECS",
                SyncSettings::default().interval,
            ),
            tolerance: parse_env_duration_millis(
                "COLLECTOR_SYNC_TOLERANCE_MS",
                SyncSettings::default().tolerance,
            ),
        };

        let buffer = BufferSettings {
            capacity: parse_env_usize(
                "COLLECTOR_BUFFER_CAPACITY",
                BufferSettings::default().capacity,
            ),
            flush_timeout: parse_env_duration_secs(
                "COLLECTOR_BUFFER_FLUSH_TIMEOUT_SECS",
                BufferSettings::default().flush_timeout,
            ),
            poll_interval: parse_env_duration_millis(
                "COLLECTOR_BUFFER_POLL_INTERVAL_MS",
                BufferSettings::default().poll_interval,
            ),
        };

        let config = Self {
            credentials: Credentials::new(api_token),
            symbols,
            stream,
            rate_limit,
            sync,
            buffer,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "symbols".to_string(),
                reason: "at least one symbol is required".to_string(),
            });
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.max_requests".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rate_limit.time_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.time_window".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.sync.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sync.interval".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.sync.tolerance >= self.sync.interval {
            return Err(ConfigError::InvalidValue {
                field: "sync.tolerance".to_string(),
                reason: "must be shorter than the sync interval".to_string(),
            });
        }
        if self.buffer.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "buffer.capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.buffer.flush_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "buffer.flush_timeout".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.stream.max_misses == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.max_misses".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the trade stream WebSocket URL with the token attached.
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!(
            "wss://ws.finnhub.io?token={}",
            self.credentials.api_token()
        )
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// A setting is out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Which setting failed validation.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Parse a comma-separated symbol list, trimming and uppercasing entries.
#[must_use]
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(ToString::to_string).collect()
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> CollectorConfig {
        CollectorConfig {
            credentials: Credentials::new("test-token".to_string()),
            symbols: default_symbols(),
            stream: StreamSettings::default(),
            rate_limit: RateLimitSettings::default(),
            sync: SyncSettings::default(),
            buffer: BufferSettings::default(),
        }
    }

    #[test]
    fn default_symbols_list() {
        let symbols = default_symbols();
        assert_eq!(symbols.len(), 10);
        assert_eq!(symbols[0], "AAPL");
        assert_eq!(symbols[9], "NFLX");
    }

    #[test]
    fn parse_symbols_trims_and_uppercases() {
        let symbols = parse_symbols(" aapl, MSFT ,tsla,,");
        assert_eq!(symbols, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn parse_symbols_empty_input() {
        assert!(parse_symbols("").is_empty());
        assert!(parse_symbols(" , ,").is_empty());
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let creds = Credentials::new("super-secret".to_string());
        let debug = format!("{creds:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn stream_url_includes_token() {
        let config = valid_config();
        assert_eq!(
            config.stream_url(),
            "wss://ws.finnhub.io?token=test-token"
        );
    }

    #[test]
    fn default_settings_match_production_values() {
        let stream = StreamSettings::default();
        assert_eq!(stream.reconnect_delay, Duration::from_secs(1));
        assert_eq!(stream.max_retries, 3);
        assert_eq!(stream.ping_interval, Duration::from_secs(5));

        let rate_limit = RateLimitSettings::default();
        assert_eq!(rate_limit.max_requests, 30);
        assert_eq!(rate_limit.time_window, Duration::from_secs(60));

        let sync = SyncSettings::default();
        assert_eq!(sync.interval, Duration::from_secs(3));
        assert_eq!(sync.tolerance, Duration::from_millis(500));

        let buffer = BufferSettings::default();
        assert_eq!(buffer.capacity, 100);
        assert_eq!(buffer.flush_timeout, Duration::from_secs(5));
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_symbols_fails_validation() {
        let mut config = valid_config();
        config.symbols.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "symbols"
        ));
    }

    #[test]
    fn zero_rate_limit_fails_validation() {
        let mut config = valid_config();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tolerance_must_be_below_interval() {
        let mut config = valid_config();
        config.sync.tolerance = config.sync.interval;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "sync.tolerance"
        ));
    }

    #[test]
    fn zero_buffer_capacity_fails_validation() {
        let mut config = valid_config();
        config.buffer.capacity = 0;
        assert!(config.validate().is_err());
    }
}
