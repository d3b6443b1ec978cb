//! Test publishers — mock `Publisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use payflow_core::bus::Publisher;
use payflow_core::error::DomainError;
use payflow_core::event::Event;

/// A publisher that records every published event and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Event>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every published event.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the topics of every published event, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.topic.as_str().to_owned())
            .collect()
    }

    /// Returns the first published event with the given topic, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn first_with_topic(&self, topic: &str) -> Option<Event> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.topic.as_str() == topic)
            .cloned()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, events: &[Event]) -> Result<(), DomainError> {
        self.published.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

/// A publisher that always fails. Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _events: &[Event]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("broker unavailable".into()))
    }
}
