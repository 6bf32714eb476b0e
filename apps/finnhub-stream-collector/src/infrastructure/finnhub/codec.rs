//! Stream Codec
//!
//! JSON decoding for the Finnhub feed. A decode failure is a per-frame
//! event: the read loop logs it and skips the frame, it never tears down
//! the connection.

use super::messages::FeedMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame was not a JSON object.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the trade stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into a [`FeedMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object or fails to
    /// deserialize. Unknown `type` values decode to `FeedMessage::Ignored`
    /// rather than erroring.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            // Char-based truncation: a byte slice could split a multibyte
            // character and panic inside the read loop.
            let preview: String = trimmed.chars().take(50).collect();
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {preview}..."
            )));
        }

        Ok(serde_json::from_str(trimmed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn decode_trade_frame() {
        let codec = JsonCodec::new();
        let text = r#"{"type":"trade","data":[
            {"s":"AAPL","p":150.25,"v":100,"t":1700000000000},
            {"s":"MSFT","p":400.5,"t":1700000000001}
        ]}"#;

        let msg = codec.decode(text).unwrap();
        let FeedMessage::Trade { data } = msg else {
            panic!("expected trade frame");
        };
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].symbol, "AAPL");
        assert_eq!(data[0].price, Decimal::new(15025, 2));
        assert_eq!(data[0].volume, Some(Decimal::new(100, 0)));
        assert_eq!(data[1].symbol, "MSFT");
        assert!(data[1].volume.is_none());
    }

    #[test]
    fn decode_ping_frame() {
        let codec = JsonCodec::new();
        let msg = codec.decode(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, FeedMessage::Ping);
    }

    #[test]
    fn decode_error_frame() {
        let codec = JsonCodec::new();
        let msg = codec
            .decode(r#"{"type":"error","msg":"Subscribing to too many symbols"}"#)
            .unwrap();
        let FeedMessage::Error { msg } = msg else {
            panic!("expected error frame");
        };
        assert_eq!(msg, "Subscribing to too many symbols");
    }

    #[test]
    fn unknown_type_is_ignored() {
        let codec = JsonCodec::new();
        let msg = codec.decode(r#"{"type":"news","headline":"..."}"#).unwrap();
        assert_eq!(msg, FeedMessage::Ignored);
    }

    #[test]
    fn malformed_json_errors() {
        let codec = JsonCodec::new();
        assert!(codec.decode(r#"{"type":"trade","data":"#).is_err());
    }

    #[test]
    fn non_object_errors() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode("not json"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn long_multibyte_garbage_is_rejected_without_panicking() {
        let codec = JsonCodec::new();
        // A multibyte character straddling the preview cutoff must not
        // split mid-character.
        let frame = format!("{}é plus trailing garbage", "x".repeat(49));
        assert!(matches!(
            codec.decode(&frame),
            Err(CodecError::InvalidFormat(_))
        ));
    }
}
