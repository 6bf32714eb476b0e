//! Port Interfaces
//!
//! Contracts the collector holds against external collaborators. The only
//! outbound port is the storage sink: the persistence engine itself lives
//! outside this process and is consumed strictly through [`TradeStore`].
//!
//! Delivery is at-most-once: a failed insert is logged and the record is
//! dropped, and the store must tolerate duplicate records across reconnect
//! cycles since the collector performs no dedup at this boundary.

use async_trait::async_trait;

use crate::domain::trade::TradeEvent;

/// Error returned by a storage collaborator for a single record.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store is temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected this specific record.
    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Downstream storage sink for sampled trades.
///
/// Implementations may fail independently per record; the caller never
/// retries a failed insert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Persist a single trade record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the record could not be written.
    async fn insert(&self, record: &TradeEvent) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let err = StorageError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");

        let err = StorageError::Rejected("symbol too long".to_string());
        assert_eq!(err.to_string(), "record rejected: symbol too long");
    }
}
