//! # Change Feed
//!
//! Push-based change notifications for the read/dashboard path.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger commit/reverse/amend, repository create/update/delete          │
//! │       │                                                                 │
//! │       │ publish(ChangeEvent)  - only AFTER the transaction committed   │
//! │       ▼                                                                 │
//! │  tokio::sync::broadcast ──► dashboard subscribers re-read a snapshot   │
//! │                                                                         │
//! │  The write path never depends on subscribers: publishing to a channel  │
//! │  with no receivers is a no-op, and a slow subscriber that lags simply  │
//! │  misses intermediate events and re-reads current state.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subscribers get "something in this collection changed" hints, not the
//! documents themselves - the read path re-queries its own point-in-time
//! snapshot, which may lag in-flight writes (acceptable on the dashboard).

use tokio::sync::broadcast;
use tracing::debug;

/// How many events a lagging subscriber can buffer before it starts
/// missing them (missed events just mean "re-read sooner").
const CHANNEL_CAPACITY: usize = 64;

/// A document collection in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Customers,
    Products,
    StockMovements,
}

/// A change hint: some document in `collection` was created, updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
}

/// Broadcast handle shared by repositories and the ledger engine.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        ChangeFeed { tx }
    }

    /// Subscribes to change events. Each receiver sees events published
    /// after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publishes a change hint. Never fails: no receivers is fine.
    pub fn publish(&self, collection: Collection, id: impl Into<String>) {
        let event = ChangeEvent {
            collection,
            id: id.into(),
        };
        debug!(?event.collection, id = %event.id, "Publishing change event");
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new()
    }
}
