//! Finnhub WebSocket Client
//!
//! Owns the feed socket and drives the connection lifecycle: subscribe on
//! open, sample inbound trades through the sync window into the buffer,
//! answer keepalives, classify failures, and reconnect under the bounded
//! backoff policy.
//!
//! # Stream URL
//!
//! `wss://ws.finnhub.io?token=<API_TOKEN>`
//!
//! # Protocol
//!
//! Messages are JSON objects with a `type` discriminator; see
//! [`super::messages`]. Liveness uses native ping/pong opcodes, with
//! Finnhub's application-level `{"type":"ping"}` answered as well.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
use super::messages::{FeedMessage, PongResponse, SubscribeRequest};
use super::reconnect::{DisconnectCause, ReconnectConfig, ReconnectPolicy};
use crate::domain::connection::ConnectionState;
use crate::domain::sync_window::{SyncWindowCollector, SyncWindowConfig};
use crate::infrastructure::buffer::TradeBuffer;
use crate::infrastructure::metrics;
use crate::infrastructure::ratelimit::RateLimiter;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The provider signalled throttling.
    #[error("provider rate limit: {0}")]
    RateLimited(String),

    /// Liveness checks exhausted; the socket was force-closed.
    #[error("liveness timeout")]
    LivenessTimeout,

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FeedClientError {
    /// Map a failure to the backoff class the reconnect policy uses.
    #[must_use]
    pub fn disconnect_cause(&self) -> DisconnectCause {
        match self {
            Self::RateLimited(_) => DisconnectCause::RateLimit,
            Self::WebSocket(tokio_tungstenite::tungstenite::Error::Http(response))
                if response.status().as_u16() == 429 =>
            {
                DisconnectCause::RateLimit
            }
            _ => DisconnectCause::Transport,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connection_failed",
            Self::WebSocket(_) => "websocket",
            Self::RateLimited(_) => "rate_limited",
            Self::LivenessTimeout => "liveness_timeout",
            Self::ConnectionClosed => "connection_closed",
        }
    }
}

// =============================================================================
// Feed Client Events
// =============================================================================

/// Events emitted by the feed client for observability.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Connected and subscribed.
    Connected {
        /// Number of symbols subscribed.
        symbols: usize,
    },
    /// Disconnected from the server.
    Disconnected,
    /// Liveness checks are being missed.
    Degraded {
        /// Consecutive misses so far.
        misses: u32,
    },
    /// Reconnecting to the server.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// Provider error frame received.
    Error(String),
}

// =============================================================================
// Feed Client Configuration
// =============================================================================

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// WebSocket URL including the API token query parameter.
    pub url: String,
    /// Symbols to subscribe on every (re)connect. Fixed at startup.
    pub symbols: Vec<String>,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
    /// Sync window configuration.
    pub sync_window: SyncWindowConfig,
}

// =============================================================================
// Feed Client
// =============================================================================

/// WebSocket client for the Finnhub trade stream.
///
/// Manages the connection lifecycle including:
/// - Subscription on open, rate-limited per control frame
/// - Per-window, per-symbol sampling into the bounded buffer
/// - Heartbeat monitoring with forced reconnect on missed liveness
/// - Automatic reconnection with bounded backoff and rate-limit cool-down
pub struct FeedClient {
    config: FeedClientConfig,
    codec: JsonCodec,
    buffer: Arc<TradeBuffer>,
    limiter: Arc<RateLimiter>,
    event_tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    state: parking_lot::RwLock<ConnectionState>,
}

impl FeedClient {
    /// Create a new feed client.
    #[must_use]
    pub fn new(
        config: FeedClientConfig,
        buffer: Arc<TradeBuffer>,
        limiter: Arc<RateLimiter>,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            buffer,
            limiter,
            event_tx,
            cancel,
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        tracing::debug!(state = state.as_str(), "Connection state changed");
        metrics::set_connection_state(state);
    }

    /// Run the feed connection loop until cancelled.
    ///
    /// Steady-state failures are never fatal: every disconnect is
    /// classified, waited out under the reconnect policy, and retried.
    pub async fn run(self: Arc<Self>) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Feed client cancelled");
                return;
            }

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::info!("Feed connection closed gracefully");
                    return;
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::warn!(error = %e, "Feed connection error");
                    metrics::record_websocket_error(e.kind());

                    let _ = self.event_tx.send(FeedEvent::Disconnected).await;

                    let cause = e.disconnect_cause();
                    let delay = policy.next_delay(cause);
                    let attempt = policy.retry_count();
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        rate_limited = (cause == DisconnectCause::RateLimit),
                        "Reconnecting to trade feed"
                    );
                    metrics::record_reconnect();

                    let _ = self.event_tx.send(FeedEvent::Reconnecting { attempt }).await;

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Feed client cancelled during reconnect delay");
                            return;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Connect, subscribe, and process frames until error or cancellation.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), FeedClientError> {
        self.set_state(ConnectionState::Connecting);
        tracing::info!("Connecting to trade feed");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Successful open: retry counter resets, sync window restarts.
        policy.reset();
        let mut sync_window = SyncWindowCollector::new(self.config.sync_window);

        // Resubscribe every configured symbol, each control frame passing
        // rate-limit admission to avoid provider-side throttling.
        for symbol in &self.config.symbols {
            self.limiter.wait_if_needed().await;
            let frame = serde_json::to_string(&SubscribeRequest::new(symbol))
                .map_err(|e| FeedClientError::ConnectionFailed(format!(
                    "failed to serialize subscribe: {e}"
                )))?;
            write.send(Message::Text(frame.into())).await?;
            tracing::debug!(symbol, "Subscription requested");
        }

        self.set_state(ConnectionState::Connected);
        let _ = self
            .event_tx
            .send(FeedEvent::Connected {
                symbols: self.config.symbols.len(),
            })
            .await;

        // Liveness monitoring for this connection.
        let heartbeat_state = Arc::new(HeartbeatState::new());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel::<HeartbeatEvent>(10);
        let heartbeat_cancel = CancellationToken::new();
        let heartbeat_manager = HeartbeatManager::new(
            self.config.heartbeat,
            Arc::clone(&heartbeat_state),
            heartbeat_tx,
            heartbeat_cancel.clone(),
        );
        let _heartbeat_handle = tokio::spawn(heartbeat_manager.run());

        let result = self
            .read_loop(
                &mut write,
                &mut read,
                &mut sync_window,
                &heartbeat_state,
                &mut heartbeat_rx,
            )
            .await;

        heartbeat_cancel.cancel();
        result
    }

    /// Process inbound frames and heartbeat events until the connection
    /// ends.
    async fn read_loop<W, R>(
        &self,
        write: &mut W,
        read: &mut R,
        sync_window: &mut SyncWindowCollector,
        heartbeat_state: &Arc<HeartbeatState>,
        heartbeat_rx: &mut mpsc::Receiver<HeartbeatEvent>,
    ) -> Result<(), FeedClientError>
    where
        W: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
        R: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Ok(());
                }
                heartbeat_event = heartbeat_rx.recv() => {
                    match heartbeat_event {
                        Some(HeartbeatEvent::SendPing) => {
                            heartbeat_state.mark_ping_sent();
                            write.send(Message::Ping(vec![].into())).await?;
                        }
                        Some(HeartbeatEvent::Miss { count }) => {
                            self.set_state(ConnectionState::Degraded);
                            let _ = self.event_tx.send(FeedEvent::Degraded { misses: count }).await;
                        }
                        Some(HeartbeatEvent::Dead) => {
                            tracing::warn!("Liveness checks exhausted, force-closing socket");
                            return Err(FeedClientError::LivenessTimeout);
                        }
                        None => {
                            tracing::debug!("Heartbeat channel closed");
                        }
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text, sync_window, write).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            if self.state() == ConnectionState::Degraded {
                                self.set_state(ConnectionState::Connected);
                            }
                            heartbeat_state.record_pong();
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server sent close frame");
                            return Err(FeedClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore binary and frame fragments.
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Err(FeedClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Handle a text frame.
    ///
    /// Parse failures are logged and the frame skipped; the read loop keeps
    /// running. Only an explicit provider throttle signal ends the
    /// connection.
    async fn handle_text_message<W>(
        &self,
        text: &str,
        sync_window: &mut SyncWindowCollector,
        write: &mut W,
    ) -> Result<(), FeedClientError>
    where
        W: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let message = match self.codec.decode(text) {
            Ok(message) => message,
            Err(e) => {
                metrics::record_parse_error();
                tracing::warn!(error = %e, "Skipping malformed frame");
                return Ok(());
            }
        };

        match message {
            FeedMessage::Trade { data } => {
                let ingest_time = chrono::Utc::now();
                metrics::record_trades_received(data.len() as u64);

                for trade in data {
                    // Validate before the sampling gate so a bad tick does
                    // not consume the symbol's slot for the whole window.
                    let Some(event) = trade.to_event(ingest_time) else {
                        metrics::record_parse_error();
                        tracing::warn!(
                            symbol = %trade.symbol,
                            timestamp_ms = trade.timestamp_ms,
                            "Skipping trade with invalid timestamp"
                        );
                        continue;
                    };

                    if !sync_window.should_process(&trade.symbol) {
                        continue;
                    }

                    match self.buffer.try_enqueue(event) {
                        Ok(depth) => {
                            metrics::record_trade_sampled();
                            metrics::set_buffer_depth(depth as f64);
                        }
                        Err(e) => {
                            // Deliberate shedding: a full buffer drops the
                            // tick instead of stalling the read loop.
                            metrics::record_trade_dropped();
                            tracing::warn!(
                                symbol = %trade.symbol,
                                error = %e,
                                "Dropping trade, buffer full"
                            );
                        }
                    }
                }

                if sync_window.collected_count() == self.config.symbols.len() {
                    tracing::debug!("Collected data for all symbols in this cycle");
                }
            }
            FeedMessage::Ping => {
                let frame = serde_json::to_string(&PongResponse::new())
                    .map_err(|e| FeedClientError::ConnectionFailed(format!(
                        "failed to serialize pong: {e}"
                    )))?;
                write.send(Message::Text(frame.into())).await?;
            }
            FeedMessage::Error { msg } => {
                if is_rate_limit_message(&msg) {
                    return Err(FeedClientError::RateLimited(msg));
                }
                tracing::error!(msg = %msg, "Feed error frame");
                let _ = self.event_tx.send(FeedEvent::Error(msg)).await;
            }
            FeedMessage::Ignored => {
                tracing::trace!("Ignoring unhandled message type");
            }
        }

        Ok(())
    }
}

/// Whether a provider error frame is an explicit throttle indicator.
fn is_rate_limit_message(msg: &str) -> bool {
    let lowered = msg.to_lowercase();
    lowered.contains("429") || lowered.contains("rate limit") || lowered.contains("too many")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_frames_detected() {
        assert!(is_rate_limit_message("HTTP 429 returned"));
        assert!(is_rate_limit_message("Rate limit exceeded"));
        assert!(is_rate_limit_message("Subscribing to too many symbols"));
        assert!(!is_rate_limit_message("Invalid API key"));
    }

    #[test]
    fn rate_limited_error_maps_to_rate_limit_cause() {
        let err = FeedClientError::RateLimited("slow down".to_string());
        assert_eq!(err.disconnect_cause(), DisconnectCause::RateLimit);
    }

    #[test]
    fn transport_errors_map_to_standard_backoff() {
        assert_eq!(
            FeedClientError::ConnectionClosed.disconnect_cause(),
            DisconnectCause::Transport
        );
        assert_eq!(
            FeedClientError::LivenessTimeout.disconnect_cause(),
            DisconnectCause::Transport
        );
    }

    #[test]
    fn error_kinds_for_metrics() {
        assert_eq!(FeedClientError::ConnectionClosed.kind(), "connection_closed");
        assert_eq!(FeedClientError::LivenessTimeout.kind(), "liveness_timeout");
        assert_eq!(
            FeedClientError::RateLimited(String::new()).kind(),
            "rate_limited"
        );
    }
}
