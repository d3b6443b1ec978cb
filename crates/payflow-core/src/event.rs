//! Event envelope, topic pattern matching, and metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;

/// Envelope schema version stamped on every event.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Metadata key the transport uses for the broker message id.
pub const QUEUE_MESSAGE_ID_KEY: &str = "queue_message_id";

/// Metadata key the transport uses for the broker receipt handle.
pub const RECEIPT_HANDLE_KEY: &str = "receipt_handle";

/// Metadata keys reserved for the transport; never forwarded as message
/// attributes on publish.
pub const RESERVED_METADATA_KEYS: [&str; 2] = [QUEUE_MESSAGE_ID_KEY, RECEIPT_HANDLE_KEY];

/// A dotted event topic with pattern matching support.
///
/// Patterns understand `*` as a single-segment wildcard and `#` as an
/// any-prefix/suffix/contains marker when placed at the start, end, or both
/// ends of the pattern. A pattern of just `#` matches every topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the topic is empty.
    pub fn new(topic: &str) -> Result<Self, DomainError> {
        if topic.is_empty() {
            return Err(DomainError::Validation("topic must not be empty".into()));
        }
        Ok(Self(topic.to_owned()))
    }

    /// Returns the topic as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether this topic matches the given pattern.
    #[must_use]
    pub fn matches(&self, pattern: &Topic) -> bool {
        let topic = self.as_str();
        let pattern = pattern.as_str();

        if let Some(needle) = pattern
            .strip_prefix('#')
            .and_then(|rest| rest.strip_suffix('#'))
        {
            return topic.contains(needle);
        }
        if let Some(suffix) = pattern.strip_prefix('#') {
            return topic.ends_with(suffix);
        }
        if let Some(prefix) = pattern.strip_suffix('#') {
            return topic.starts_with(prefix);
        }

        let pattern_parts: Vec<&str> = pattern.split('.').collect();
        let topic_parts: Vec<&str> = topic.split('.').collect();
        if pattern_parts.len() != topic_parts.len() {
            return false;
        }
        pattern_parts
            .iter()
            .zip(&topic_parts)
            .all(|(p, t)| *p == "*" || p == t)
    }
}

impl From<&str> for Topic {
    fn from(topic: &str) -> Self {
        Self(topic.to_owned())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// String-keyed event metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Sets a metadata entry, replacing any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a metadata entry.
    pub fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }

    /// Returns true when the key is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copies every entry of `other` into `self`, overwriting on collision.
    pub fn merge(&mut self, other: &Metadata) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Superset check: every entry of `required` is present with an equal
    /// value. Empty `required` matches everything.
    #[must_use]
    pub fn matches(&self, required: &Metadata) -> bool {
        required
            .0
            .iter()
            .all(|(k, v)| self.0.get(k).is_some_and(|own| own == v))
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A domain event envelope.
///
/// The payload is held as a JSON value so the envelope can carry a
/// structured payload, a pre-serialized document, or bytes parsed off the
/// wire, and round-trips through `to_json`/`from_json` unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Dotted topic, e.g. `payment.created`.
    pub topic: Topic,
    /// Envelope schema version.
    pub version: String,
    /// JSON payload.
    pub data: serde_json::Value,
    /// String-keyed metadata.
    pub metadata: Metadata,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Correlates the event with the command or event that caused it.
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
}

impl Event {
    /// Creates an event from a structured payload.
    ///
    /// Payload types are plain `Serialize` structs; their conversion to a
    /// JSON value cannot fail.
    #[must_use]
    pub fn new(
        aggregate_id: Uuid,
        topic: &str,
        payload: &impl Serialize,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            topic: Topic::from(topic),
            version: ENVELOPE_VERSION.to_owned(),
            data: serde_json::to_value(payload).expect("event payload serialization is infallible"),
            metadata: Metadata::new(),
            timestamp: clock.now(),
            correlation_id: None,
        }
    }

    /// Creates an event whose payload is raw, pre-serialized JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the bytes are not valid JSON.
    pub fn from_raw_payload(
        aggregate_id: Uuid,
        topic: &str,
        payload: &[u8],
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let data: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| DomainError::Validation(format!("invalid event payload: {e}")))?;
        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id,
            topic: Topic::from(topic),
            version: ENVELOPE_VERSION.to_owned(),
            data,
            metadata: Metadata::new(),
            timestamp: clock.now(),
            correlation_id: None,
        })
    }

    /// Adds a metadata entry, builder style.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.set(key, value);
        self
    }

    /// Sets the correlation id, builder style.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Deserializes the payload into a caller-supplied type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the payload does not match the
    /// receiver's shape.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            DomainError::Validation(format!("invalid {} payload: {e}", self.topic))
        })
    }

    /// Serializes the payload alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when serialization fails.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(&self.data)
            .map_err(|e| DomainError::Infrastructure(format!("payload serialization: {e}")))
    }

    /// Serializes the full envelope for the wire.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self)
            .map_err(|e| DomainError::Infrastructure(format!("envelope serialization: {e}")))
    }

    /// Parses an envelope off the wire.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the bytes are not a valid
    /// envelope.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DomainError::Validation(format!("invalid event envelope: {e}")))
    }

    /// True when the topic matches the pattern and the metadata is a
    /// superset of `required`.
    #[must_use]
    pub fn matches(&self, pattern: &Topic, required: &Metadata) -> bool {
        self.topic.matches(pattern) && self.metadata.matches(required)
    }
}
