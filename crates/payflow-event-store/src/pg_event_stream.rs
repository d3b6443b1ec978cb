//! `PostgreSQL` implementation of the [`EventStream`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use payflow_core::error::DomainError;
use payflow_core::event::{Event, Metadata, Topic};

use crate::stream::EventStream;

/// PostgreSQL-backed event stream.
#[derive(Debug, Clone)]
pub struct PgEventStream {
    pool: PgPool,
}

impl PgEventStream {
    /// Creates a new `PgEventStream`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infra(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("event stream: {e}"))
}

#[async_trait]
impl EventStream for PgEventStream {
    async fn append(&self, events: &[Event]) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infra)?;
        for event in events {
            let metadata = serde_json::to_value(&event.metadata)
                .map_err(|e| DomainError::Infrastructure(format!("metadata serialization: {e}")))?;
            sqlx::query(
                r"
                INSERT INTO event_stream (
                    id, aggregate_id, event_type, version, data, metadata,
                    timestamp, correlation_id, stream_version
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8,
                    (SELECT COALESCE(MAX(stream_version), 0) + 1
                       FROM event_stream WHERE aggregate_id = $2)
                )",
            )
            .bind(event.id)
            .bind(event.aggregate_id)
            .bind(event.topic.as_str())
            .bind(&event.version)
            .bind(&event.data)
            .bind(metadata)
            .bind(event.timestamp)
            .bind(event.correlation_id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }
        tx.commit().await.map_err(infra)
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<Event>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT id, aggregate_id, event_type, version, data, metadata,
                   timestamp, correlation_id
              FROM event_stream
             WHERE aggregate_id = $1
             ORDER BY stream_version",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: serde_json::Value = row.get("metadata");
            let metadata: Metadata = serde_json::from_value(metadata).map_err(|e| {
                DomainError::Infrastructure(format!("metadata deserialization: {e}"))
            })?;
            let topic: String = row.get("event_type");
            let timestamp: DateTime<Utc> = row.get("timestamp");
            events.push(Event {
                id: row.get("id"),
                aggregate_id: row.get("aggregate_id"),
                topic: Topic::from(topic.as_str()),
                version: row.get("version"),
                data: row.get("data"),
                metadata,
                timestamp,
                correlation_id: row.get("correlation_id"),
            });
        }
        Ok(events)
    }
}
