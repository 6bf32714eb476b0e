//! Finnhub WebSocket Message Types
//!
//! Wire format types for the Finnhub trade stream. Messages are JSON
//! objects carrying a `type` discriminator:
//!
//! - `{"type":"trade","data":[{"s":"AAPL","p":150.25,"v":100,"t":1700000000000}]}`
//! - `{"type":"ping"}` - application-level keepalive, answered with a pong
//! - `{"type":"error","msg":"..."}`
//!
//! Any other `type` value is ignored. Outbound control frames are
//! `{"type":"subscribe","symbol":"<SYMBOL>"}`, one per tracked symbol.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trade::TradeEvent;

/// Inbound message from the feed, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// A batch of trade ticks.
    Trade {
        /// Trades contained in this frame.
        data: Vec<TradeMessage>,
    },
    /// Application-level keepalive from the server.
    Ping,
    /// Provider error frame.
    Error {
        /// Human-readable error description.
        msg: String,
    },
    /// Any message type this client does not handle.
    #[serde(other)]
    Ignored,
}

/// A single trade tick as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMessage {
    /// Ticker symbol.
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last price.
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Volume; absent for some venues.
    #[serde(rename = "v", default)]
    pub volume: Option<Decimal>,

    /// Exchange timestamp in epoch milliseconds.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,

    /// Trade conditions, when the venue reports them.
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

impl TradeMessage {
    /// Convert to a domain event, stamping the ingestion time.
    ///
    /// Returns `None` when the exchange timestamp does not map to a valid
    /// instant; the caller skips the tick like any other parse failure.
    #[must_use]
    pub fn to_event(&self, ingest_time: DateTime<Utc>) -> Option<TradeEvent> {
        let event_time = Utc.timestamp_millis_opt(self.timestamp_ms).single()?;
        Some(TradeEvent::new(
            self.symbol.clone(),
            self.price,
            self.volume,
            event_time,
            ingest_time,
        ))
    }
}

/// Outbound subscribe control frame.
///
/// # Wire Format
/// ```json
/// {"type":"subscribe","symbol":"AAPL"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    /// Always "subscribe".
    #[serde(rename = "type")]
    pub msg_type: &'static str,

    /// Symbol to subscribe.
    pub symbol: String,
}

impl SubscribeRequest {
    /// Create a subscribe request for one symbol.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            msg_type: "subscribe",
            symbol: symbol.to_string(),
        }
    }
}

/// Outbound application-level pong, answering a `{"type":"ping"}` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PongResponse {
    /// Always "pong".
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

impl PongResponse {
    /// Create the pong frame.
    #[must_use]
    pub const fn new() -> Self {
        Self { msg_type: "pong" }
    }
}

impl Default for PongResponse {
    fn default() -> Self {
        Self::new()
    }
}
