//! Finnhub WebSocket Adapter
//!
//! Implements the resilient WebSocket client for Finnhub's real-time trade
//! stream:
//!
//! - **client**: Connection lifecycle, subscription, frame dispatch
//! - **codec**: JSON frame decoding
//! - **heartbeat**: Ping/pong liveness monitoring
//! - **reconnect**: Bounded backoff with rate-limit cool-down
//! - **messages**: Wire format types

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;

pub use client::{FeedClient, FeedClientConfig, FeedClientError, FeedEvent};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
pub use messages::{FeedMessage, PongResponse, SubscribeRequest, TradeMessage};
pub use reconnect::{DisconnectCause, ReconnectConfig, ReconnectPolicy};
