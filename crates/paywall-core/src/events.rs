//! Event broadcasting.
//!
//! Every committed mutation emits one [`Event`]. Subscribers each get an
//! independent buffer; a slow subscriber lags and loses the oldest events
//! rather than blocking the service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use paywall_types::events::{Event, PaywallEvent};
use paywall_types::Tick;
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_000;

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp `payload` with the next sequence number and broadcast it.
    pub fn emit(&self, tick: Tick, payload: PaywallEvent) -> Event {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event {
            sequence,
            tick,
            payload,
        };
        tracing::trace!(sequence, category = event.payload.category(), "event emitted");
        // No subscribers is fine.
        let _ = self.sender.send(event.clone());
        event
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sequence number of the last emitted event.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sequence", &self.sequence())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
