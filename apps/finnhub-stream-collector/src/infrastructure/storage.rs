//! Trade Store Adapters
//!
//! Concrete [`TradeStore`] implementations. The production persistence
//! engine lives outside this process; the default binary wires
//! [`TracingTradeStore`] so flushed records are visible in logs, and
//! [`MemoryTradeStore`] backs integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{StorageError, TradeStore};
use crate::domain::trade::TradeEvent;

// =============================================================================
// Tracing Store
// =============================================================================

/// Store that logs each record at info level and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTradeStore;

impl TracingTradeStore {
    /// Create a new tracing store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TradeStore for TracingTradeStore {
    async fn insert(&self, record: &TradeEvent) -> Result<(), StorageError> {
        tracing::info!(
            symbol = %record.symbol,
            price = %record.price,
            volume = ?record.volume,
            event_time = %record.event_time,
            "Trade stored"
        );
        Ok(())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Store that appends records to an in-memory vector.
#[derive(Debug, Default)]
pub struct MemoryTradeStore {
    records: Mutex<Vec<TradeEvent>>,
}

impl MemoryTradeStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records have been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of all stored records.
    #[must_use]
    pub fn records(&self) -> Vec<TradeEvent> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn insert(&self, record: &TradeEvent) -> Result<(), StorageError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
