//! Store-then-publish decorator.

use std::sync::Arc;

use async_trait::async_trait;

use payflow_core::bus::Publisher;
use payflow_core::error::DomainError;
use payflow_core::event::Event;

use crate::stream::EventStream;

/// Appends events to the stream before handing them to the wrapped
/// publisher. A failed append fails the publish so the bus redelivers; a
/// duplicate append on retry is acceptable because the stream is never read
/// for behaviour.
pub struct StoringPublisher {
    stream: Arc<dyn EventStream>,
    inner: Arc<dyn Publisher>,
}

impl StoringPublisher {
    /// Wraps `inner` with stream persistence.
    #[must_use]
    pub fn new(stream: Arc<dyn EventStream>, inner: Arc<dyn Publisher>) -> Self {
        Self { stream, inner }
    }
}

#[async_trait]
impl Publisher for StoringPublisher {
    async fn publish(&self, events: &[Event]) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        self.stream.append(events).await?;
        self.inner.publish(events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryEventStream;
    use payflow_core::clock::SystemClock;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingPublisher {
        published: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, events: &[Event]) -> Result<(), DomainError> {
            self.published.lock().unwrap().extend_from_slice(events);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_appends_to_stream_then_publishes() {
        // Arrange
        let stream = Arc::new(MemoryEventStream::new());
        let inner = Arc::new(RecordingPublisher {
            published: Mutex::new(Vec::new()),
        });
        let publisher = StoringPublisher::new(
            Arc::clone(&stream) as Arc<dyn EventStream>,
            Arc::clone(&inner) as Arc<dyn Publisher>,
        );
        let event = Event::new(
            Uuid::new_v4(),
            "payment.created",
            &serde_json::json!({}),
            &SystemClock,
        );

        // Act
        publisher.publish(std::slice::from_ref(&event)).await.unwrap();

        // Assert
        assert_eq!(stream.all().len(), 1);
        assert_eq!(inner.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_publish_skips_both() {
        let stream = Arc::new(MemoryEventStream::new());
        let inner = Arc::new(RecordingPublisher {
            published: Mutex::new(Vec::new()),
        });
        let publisher = StoringPublisher::new(
            Arc::clone(&stream) as Arc<dyn EventStream>,
            Arc::clone(&inner) as Arc<dyn Publisher>,
        );

        publisher.publish(&[]).await.unwrap();

        assert!(stream.all().is_empty());
        assert!(inner.published.lock().unwrap().is_empty());
    }
}
