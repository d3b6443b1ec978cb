//! Event stream abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::error::DomainError;
use payflow_core::event::Event;

/// Append-only store of event envelopes, versioned per aggregate.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Appends events, assigning each the next `stream_version` of its
    /// aggregate.
    async fn append(&self, events: &[Event]) -> Result<(), DomainError>;

    /// Loads all events for an aggregate in stream order.
    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<Event>, DomainError>;
}

/// In-memory stream for tests and single-process development.
#[derive(Default)]
pub struct MemoryEventStream {
    events: std::sync::Mutex<Vec<Event>>,
}

impl MemoryEventStream {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every appended event.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStream for MemoryEventStream {
    async fn append(&self, events: &[Event]) -> Result<(), DomainError> {
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<Event>, DomainError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }
}
