//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::Event;

/// Trait for aggregate roots that buffer domain events until persistence.
///
/// Aggregates record an envelope event for every successful transition. The
/// owning use case persists the aggregate, drains the buffer with
/// [`AggregateRoot::take_events`], and publishes.
pub trait AggregateRoot: Send + Sync {
    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version used for optimistic locking.
    fn version(&self) -> i64;

    /// Returns events recorded since the last drain.
    fn pending_events(&self) -> &[Event];

    /// Drains and returns the pending events.
    fn take_events(&mut self) -> Vec<Event>;
}
