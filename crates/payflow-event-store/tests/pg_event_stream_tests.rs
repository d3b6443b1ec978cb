//! Integration tests for `PgEventStream`.

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use payflow_core::event::{Event, Metadata, Topic};
use payflow_event_store::pg_event_stream::PgEventStream;
use payflow_event_store::stream::EventStream;

/// Helper to build an envelope with sensible defaults.
fn make_event(aggregate_id: Uuid, topic: &str) -> Event {
    let mut metadata = Metadata::new();
    metadata.set("source", "test");
    Event {
        id: Uuid::new_v4(),
        aggregate_id,
        topic: Topic::from(topic),
        version: "1.0".to_owned(),
        data: serde_json::json!({"amount": 5000, "currency": "USD"}),
        metadata,
        timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        correlation_id: Some(Uuid::new_v4()),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_returns_empty_for_unknown_aggregate(pool: PgPool) {
    let stream = PgEventStream::new(pool);

    let events = stream.load(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_load_round_trip(pool: PgPool) {
    let stream = PgEventStream::new(pool);
    let aggregate_id = Uuid::new_v4();
    let event = make_event(aggregate_id, "payment.created");

    stream.append(std::slice::from_ref(&event)).await.unwrap();

    let loaded = stream.load(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], event);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_assigns_monotonic_stream_versions(pool: PgPool) {
    let stream = PgEventStream::new(pool.clone());
    let aggregate_id = Uuid::new_v4();

    stream
        .append(&[
            make_event(aggregate_id, "payment.created"),
            make_event(aggregate_id, "payment.processing"),
        ])
        .await
        .unwrap();
    stream
        .append(&[make_event(aggregate_id, "payment.completed")])
        .await
        .unwrap();

    let versions: Vec<i64> =
        sqlx::query_scalar("SELECT stream_version FROM event_stream WHERE aggregate_id = $1 ORDER BY stream_version")
            .bind(aggregate_id)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(versions, vec![1, 2, 3]);

    let loaded = stream.load(aggregate_id).await.unwrap();
    let topics: Vec<&str> = loaded.iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec!["payment.created", "payment.processing", "payment.completed"]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_streams_are_independent_per_aggregate(pool: PgPool) {
    let stream = PgEventStream::new(pool);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    stream
        .append(&[make_event(first, "payment.created")])
        .await
        .unwrap();
    stream
        .append(&[make_event(second, "wallet.debited")])
        .await
        .unwrap();

    assert_eq!(stream.load(first).await.unwrap().len(), 1);
    assert_eq!(stream.load(second).await.unwrap().len(), 1);
}
