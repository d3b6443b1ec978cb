//! Publisher, subscriber, and handler seams for the event plane.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::DomainError;
use crate::event::Event;

/// Publishes events to the bus.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes zero or more events. Implementations batch and fan out;
    /// the first failure is surfaced after all batches settle.
    async fn publish(&self, events: &[Event]) -> Result<(), DomainError>;
}

/// Handles events delivered by a subscriber.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable identifier used in logs.
    fn handler_id(&self) -> &str;

    /// Processes one event. Returning an error requests redelivery.
    async fn handle(&self, event: &Event) -> Result<(), DomainError>;
}

/// A long-running consumer that feeds events into an [`EventHandler`].
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Starts the consumer. Idempotent.
    async fn start(&self) -> Result<(), DomainError>;

    /// Stops the consumer, cancelling in-flight work and draining tasks.
    /// Idempotent.
    async fn stop(&self) -> Result<(), DomainError>;
}

/// Adapts a closure into an [`EventHandler`].
pub struct EventHandlerFn {
    id: String,
    f: Box<dyn Fn(Event) -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync>,
}

impl EventHandlerFn {
    /// Wraps `f` as a handler with the given id.
    pub fn new<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(Event) -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl EventHandler for EventHandlerFn {
    fn handler_id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, event: &Event) -> Result<(), DomainError> {
        (self.f)(event.clone()).await
    }
}
