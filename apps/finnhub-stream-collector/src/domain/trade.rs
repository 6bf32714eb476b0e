//! Trade Event Types
//!
//! A [`TradeEvent`] is created when a trade frame arrives from the feed and
//! is destroyed once it is handed to the storage port or dropped. The same
//! shape is used as the storage record, so no conversion happens at the
//! store boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A single sampled trade, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeEvent {
    /// Ticker symbol, e.g. `AAPL`.
    pub symbol: String,

    /// Last trade price. Never negative.
    pub price: Decimal,

    /// Trade volume. The feed omits this for some venues.
    pub volume: Option<Decimal>,

    /// Exchange timestamp of the trade.
    pub event_time: DateTime<Utc>,

    /// Wall-clock time this process received the frame.
    pub ingest_time: DateTime<Utc>,
}

impl TradeEvent {
    /// Create a new trade event.
    #[must_use]
    pub const fn new(
        symbol: String,
        price: Decimal,
        volume: Option<Decimal>,
        event_time: DateTime<Utc>,
        ingest_time: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            price,
            volume,
            event_time,
            ingest_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_event_construction() {
        let now = Utc::now();
        let event = TradeEvent::new(
            "AAPL".to_string(),
            Decimal::new(15025, 2),
            Some(Decimal::new(100, 0)),
            now,
            now,
        );
        assert_eq!(event.symbol, "AAPL");
        assert_eq!(event.price, Decimal::new(15025, 2));
        assert_eq!(event.volume, Some(Decimal::new(100, 0)));
    }

    #[test]
    fn trade_event_volume_optional() {
        let now = Utc::now();
        let event = TradeEvent::new("MSFT".to_string(), Decimal::new(400, 0), None, now, now);
        assert!(event.volume.is_none());
    }

    #[test]
    fn trade_event_serializes() {
        let now = Utc::now();
        let event = TradeEvent::new("TSLA".to_string(), Decimal::new(250, 0), None, now, now);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"symbol\":\"TSLA\""));
        assert!(json.contains("\"price\":\"250\""));
    }
}
