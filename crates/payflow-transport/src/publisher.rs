//! Batched fan-out publisher.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use payflow_core::bus::Publisher;
use payflow_core::error::DomainError;
use payflow_core::event::{Event, RESERVED_METADATA_KEYS};

use crate::queue::{BatchEntry, TopicClient};

/// Maximum number of entries per publish batch.
pub const MAX_BATCH_SIZE: usize = 10;

/// Publishes events onto a topic in concurrent batches of at most
/// [`MAX_BATCH_SIZE`].
///
/// Per-event failures reported by the broker are logged, not retried; batch
/// level errors surface the first failure after all batches settle.
pub struct FanoutPublisher {
    topic: Arc<dyn TopicClient>,
}

impl FanoutPublisher {
    /// Creates a publisher over the given topic client.
    #[must_use]
    pub fn new(topic: Arc<dyn TopicClient>) -> Self {
        Self { topic }
    }
}

fn to_entry(event: &Event) -> Result<BatchEntry, DomainError> {
    let body = String::from_utf8(event.to_json()?)
        .map_err(|e| DomainError::Infrastructure(format!("non-utf8 envelope: {e}")))?;

    let mut attributes = BTreeMap::new();
    attributes.insert("topic".to_owned(), event.topic.as_str().to_owned());
    for (key, value) in event.metadata.iter() {
        if RESERVED_METADATA_KEYS.contains(&key) {
            continue;
        }
        attributes.insert(key.to_owned(), value.to_owned());
    }

    Ok(BatchEntry {
        id: event.id.to_string(),
        body,
        attributes,
    })
}

#[async_trait]
impl Publisher for FanoutPublisher {
    async fn publish(&self, events: &[Event]) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut batches = Vec::with_capacity(events.len().div_ceil(MAX_BATCH_SIZE));
        for chunk in events.chunks(MAX_BATCH_SIZE) {
            let entries = chunk.iter().map(to_entry).collect::<Result<Vec<_>, _>>()?;
            batches.push(entries);
        }

        let results = join_all(
            batches
                .into_iter()
                .map(|entries| self.topic.publish_batch(entries)),
        )
        .await;

        let mut first_error = None;
        for result in results {
            match result {
                Ok(failures) => {
                    for failure in failures {
                        warn!(
                            event_id = %failure.id,
                            reason = %failure.reason,
                            "event publication failed"
                        );
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
