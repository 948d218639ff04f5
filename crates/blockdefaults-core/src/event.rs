//! Store notifications for the presentation layer.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Panels that render block defaults need to know when values change. We use
//! `tokio::sync::broadcast` so any number of views can subscribe without the
//! store holding references to them:
//! - Events are values, not callbacks
//! - Subscribers receive clones
//! - A slow subscriber lags instead of blocking the store

use blockdefaults_model::{BlockTypeId, FieldKey};
use tokio::sync::broadcast;

use crate::store::SaveId;

/// Things that happen to a configuration store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The editing surface was opened
    Opened,
    /// One field of a block type changed locally
    FieldChanged {
        block_type: BlockTypeId,
        field: FieldKey,
    },
    /// A block type's settings were replaced wholesale
    BlockReplaced(BlockTypeId),
    /// A save was issued
    SaveStarted(SaveId),
    /// A save was requested while another was in flight
    SaveQueued,
    /// A save completed and is now the durable baseline
    Saved(SaveId),
    /// A save failed; local edits are kept
    SaveFailed { id: SaveId, message: String },
    /// The editing surface closed after a successful save
    Closed,
}

/// Event bus for broadcasting store events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Capacity of 64 events in the buffer
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for consuming events in a render loop.
///
/// ```ignore
/// let mut handler = EventHandler::new(store.subscribe());
///
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let StoreEvent::FieldChanged { block_type, .. } = event {
///             // Re-render panels for block_type
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<StoreEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<StoreEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event, skipping over any that were missed.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
