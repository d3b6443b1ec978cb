//! In-process broker with topic fan-out and visibility timeouts.
//!
//! Backs local development and the integration tests. Queues are bound to
//! the broker with a topic pattern; published entries land on every queue
//! whose pattern matches the entry's `topic` attribute.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use payflow_core::error::DomainError;
use payflow_core::event::Topic;

use crate::queue::{
    BatchEntry, BatchFailure, QueueClient, QueueMessage, ReceiveOptions, TopicClient,
};

struct StoredMessage {
    message_id: String,
    body: String,
    attributes: BTreeMap<String, String>,
    receive_count: u32,
    visible_at: Instant,
    receipt_handle: String,
}

/// A single in-memory queue with receive/ack/visibility semantics.
pub struct InMemoryQueue {
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    fn enqueue(&self, entry: &BatchEntry) {
        self.messages.lock().unwrap().push(StoredMessage {
            message_id: Uuid::new_v4().to_string(),
            body: entry.body.clone(),
            attributes: entry.attributes.clone(),
            receive_count: 0,
            visible_at: Instant::now(),
            receipt_handle: String::new(),
        });
    }

    /// Enqueues a raw body with no attributes. Lets tests exercise the
    /// unparseable-message path.
    pub fn push_raw(&self, body: &str) {
        self.enqueue(&BatchEntry {
            id: Uuid::new_v4().to_string(),
            body: body.to_owned(),
            attributes: BTreeMap::new(),
        });
    }

    /// Number of messages in the queue, visible or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn take_visible(&self, options: &ReceiveOptions) -> Vec<QueueMessage> {
        let now = Instant::now();
        let mut messages = self.messages.lock().unwrap();
        let mut received = Vec::new();

        for message in messages.iter_mut() {
            if received.len() >= options.max_messages {
                break;
            }
            if message.visible_at > now {
                continue;
            }
            message.receive_count += 1;
            message.visible_at = now + options.visibility_timeout;
            message.receipt_handle = Uuid::new_v4().to_string();
            received.push(QueueMessage {
                message_id: message.message_id.clone(),
                receipt_handle: message.receipt_handle.clone(),
                body: message.body.clone(),
                receive_count: message.receive_count,
                attributes: message.attributes.clone(),
            });
        }

        received
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, DomainError> {
        let deadline = Instant::now() + options.wait_time;
        loop {
            let batch = self.take_visible(options);
            if !batch.is_empty() {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), DomainError> {
        self.messages
            .lock()
            .unwrap()
            .retain(|m| m.receipt_handle != receipt_handle);
        Ok(())
    }

    async fn change_visibility(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> Result<(), DomainError> {
        let mut messages = self.messages.lock().unwrap();
        let Some(message) = messages
            .iter_mut()
            .find(|m| m.receipt_handle == receipt_handle)
        else {
            return Err(DomainError::Infrastructure(
                "unknown receipt handle".to_owned(),
            ));
        };
        message.visible_at = Instant::now() + timeout;
        Ok(())
    }
}

struct Binding {
    pattern: Topic,
    queue: std::sync::Arc<InMemoryQueue>,
}

/// Topic fan-out over bound in-memory queues.
#[derive(Default)]
pub struct InMemoryBroker {
    bindings: Mutex<Vec<Binding>>,
}

impl InMemoryBroker {
    /// Creates a broker with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue bound to the given topic pattern and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn bind(&self, pattern: &str) -> std::sync::Arc<InMemoryQueue> {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        self.bindings.lock().unwrap().push(Binding {
            pattern: Topic::from(pattern),
            queue: std::sync::Arc::clone(&queue),
        });
        queue
    }
}

#[async_trait]
impl TopicClient for InMemoryBroker {
    async fn publish_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> Result<Vec<BatchFailure>, DomainError> {
        let bindings = self.bindings.lock().unwrap();
        for entry in &entries {
            let Some(topic) = entry.attributes.get("topic") else {
                continue;
            };
            let topic = Topic::from(topic.as_str());
            for binding in bindings.iter() {
                if topic.matches(&binding.pattern) {
                    binding.queue.enqueue(entry);
                }
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(topic: &str, body: &str) -> BatchEntry {
        let mut attributes = BTreeMap::new();
        attributes.insert("topic".to_owned(), topic.to_owned());
        BatchEntry {
            id: Uuid::new_v4().to_string(),
            body: body.to_owned(),
            attributes,
        }
    }

    fn receive_options(visibility: Duration) -> ReceiveOptions {
        ReceiveOptions {
            max_messages: 5,
            wait_time: Duration::from_millis(10),
            visibility_timeout: visibility,
        }
    }

    #[tokio::test]
    async fn test_fan_out_respects_topic_patterns() {
        let broker = InMemoryBroker::new();
        let payments = broker.bind("payment.#");
        let everything = broker.bind("#");

        broker
            .publish_batch(vec![entry("payment.created", "{}"), entry("wallet.debited", "{}")])
            .await
            .unwrap();

        assert_eq!(payments.depth(), 1);
        assert_eq!(everything.depth(), 2);
    }

    #[tokio::test]
    async fn test_received_message_becomes_invisible_until_timeout() {
        let broker = InMemoryBroker::new();
        let queue = broker.bind("#");
        broker
            .publish_batch(vec![entry("payment.created", "{}")])
            .await
            .unwrap();

        let first = queue
            .receive(&receive_options(Duration::from_millis(40)))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].receive_count, 1);

        // Invisible while the timeout holds.
        let hidden = queue
            .receive(&receive_options(Duration::from_millis(40)))
            .await
            .unwrap();
        assert!(hidden.is_empty());

        // Visible again afterwards, with a bumped receive count.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let again = queue
            .receive(&receive_options(Duration::from_millis(40)))
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].receive_count, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_message() {
        let broker = InMemoryBroker::new();
        let queue = broker.bind("#");
        broker
            .publish_batch(vec![entry("payment.created", "{}")])
            .await
            .unwrap();

        let received = queue
            .receive(&receive_options(Duration::from_secs(30)))
            .await
            .unwrap();
        queue.delete(&received[0].receipt_handle).await.unwrap();

        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_change_visibility_postpones_redelivery() {
        let broker = InMemoryBroker::new();
        let queue = broker.bind("#");
        broker
            .publish_batch(vec![entry("payment.created", "{}")])
            .await
            .unwrap();

        let received = queue
            .receive(&receive_options(Duration::from_millis(10)))
            .await
            .unwrap();
        queue
            .change_visibility(&received[0].receipt_handle, Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let hidden = queue
            .receive(&receive_options(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(hidden.is_empty());
    }
}
