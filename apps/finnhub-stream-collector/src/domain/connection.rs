//! Connection Lifecycle States
//!
//! State machine for the feed connection. Transitions are monotonic within
//! a single connection attempt and reset to `Disconnected` on close:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Degraded -> Disconnected -> ...
//! ```

/// Connection state owned by the feed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket open.
    #[default]
    Disconnected,
    /// Socket handshake in progress.
    Connecting,
    /// Socket open and subscribed.
    Connected,
    /// Socket open but liveness checks are being missed.
    Degraded,
}

impl ConnectionState {
    /// State name for logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Degraded => "degraded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test_case(ConnectionState::Disconnected, "disconnected")]
    #[test_case(ConnectionState::Connecting, "connecting")]
    #[test_case(ConnectionState::Connected, "connected")]
    #[test_case(ConnectionState::Degraded, "degraded")]
    fn state_names(state: ConnectionState, name: &str) {
        assert_eq!(state.as_str(), name);
    }
}
