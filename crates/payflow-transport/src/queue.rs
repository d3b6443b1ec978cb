//! Broker client abstractions.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use payflow_core::error::DomainError;

/// A message received from a queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Broker-assigned message identifier.
    pub message_id: String,
    /// Handle for deleting the message or changing its visibility. Valid
    /// until the visibility timeout lapses.
    pub receipt_handle: String,
    /// Raw message body.
    pub body: String,
    /// How many times the message has been received.
    pub receive_count: u32,
    /// Message attributes attached at publish time.
    pub attributes: BTreeMap<String, String>,
}

/// Parameters for one receive call.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    /// Maximum number of messages per receive.
    pub max_messages: usize,
    /// Long-poll wait before returning an empty batch.
    pub wait_time: Duration,
    /// How long received messages stay invisible to other consumers.
    pub visibility_timeout: Duration,
}

/// Receive side of a per-service queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Long-polls the queue for up to `options.max_messages` messages.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, DomainError>;

    /// Acknowledges a message, removing it from the queue.
    async fn delete(&self, receipt_handle: &str) -> Result<(), DomainError>;

    /// Postpones a message's next delivery by `timeout`.
    async fn change_visibility(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> Result<(), DomainError>;
}

/// One entry of a batch publish request.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Caller-assigned entry id, echoed back in per-entry failures.
    pub id: String,
    /// Serialized message body.
    pub body: String,
    /// Message attributes; the `topic` attribute drives queue fan-out.
    pub attributes: BTreeMap<String, String>,
}

/// A per-entry failure from a partially successful batch publish.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// The failing entry's id.
    pub id: String,
    /// Broker-reported reason.
    pub reason: String,
}

/// Publish side of the shared topic.
#[async_trait]
pub trait TopicClient: Send + Sync {
    /// Publishes a batch of at most ten entries. Returns per-entry failures
    /// when the broker reports a partial failure.
    async fn publish_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> Result<Vec<BatchFailure>, DomainError>;
}
