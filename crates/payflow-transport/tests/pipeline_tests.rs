//! Integration tests for the subscriber pipeline over the in-memory broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use payflow_core::bus::{EventHandlerFn, Publisher, Subscriber};
use payflow_core::clock::SystemClock;
use payflow_core::error::DomainError;
use payflow_core::event::Event;
use payflow_transport::memory::InMemoryBroker;
use payflow_transport::publisher::FanoutPublisher;
use payflow_transport::queue::{QueueClient, TopicClient};
use payflow_transport::subscriber::{QueueSubscriber, SubscriberOptions};

/// Fast timings so tests finish quickly.
fn test_options() -> SubscriberOptions {
    SubscriberOptions {
        readers: 1,
        workers: 2,
        cleaners: 1,
        wait_time: Duration::from_millis(40),
        visibility_timeout: Duration::from_millis(150),
        sleep_after_empty_receive: Duration::from_millis(20),
        sleep_after_error: Duration::from_millis(20),
        visibility_timeout_offset: Duration::from_millis(50),
        max_visibility_timeout: Duration::from_millis(400),
        ..SubscriberOptions::default()
    }
}

async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn sample_event(topic: &str) -> Event {
    Event::new(
        Uuid::new_v4(),
        topic,
        &serde_json::json!({"n": 1}),
        &SystemClock,
    )
}

#[tokio::test]
async fn test_happy_path_delivers_and_acks() {
    // Arrange
    let broker = Arc::new(InMemoryBroker::new());
    let queue = broker.bind("payment.#");
    let publisher = FanoutPublisher::new(Arc::clone(&broker) as Arc<dyn TopicClient>);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = Arc::new(EventHandlerFn::new("record", move |event| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().unwrap().push(event.topic.as_str().to_owned());
            Ok(())
        })
    }));
    let subscriber = QueueSubscriber::new(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        handler,
        test_options(),
    );

    // Act
    subscriber.start().await.unwrap();
    publisher
        .publish(&[sample_event("payment.created")])
        .await
        .unwrap();

    // Assert — handled once and deleted from the queue.
    assert!(wait_until(Duration::from_secs(2), || !seen.lock().unwrap().is_empty()).await);
    assert!(wait_until(Duration::from_secs(2), || queue.depth() == 0).await);
    assert_eq!(seen.lock().unwrap().as_slice(), ["payment.created"]);

    subscriber.stop().await.unwrap();
}

#[tokio::test]
async fn test_handler_receives_transport_metadata() {
    let broker = Arc::new(InMemoryBroker::new());
    let queue = broker.bind("#");
    let publisher = FanoutPublisher::new(Arc::clone(&broker) as Arc<dyn TopicClient>);

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let handler = Arc::new(EventHandlerFn::new("capture", move |event| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().unwrap().push(event);
            Ok(())
        })
    }));
    let subscriber = QueueSubscriber::new(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        handler,
        test_options(),
    );
    subscriber.start().await.unwrap();

    publisher
        .publish(&[sample_event("wallet.debited").with_metadata("tenant", "a")])
        .await
        .unwrap();

    assert!(wait_until(Duration::from_secs(2), || !captured.lock().unwrap().is_empty()).await);
    let events = captured.lock().unwrap();
    let event = &events[0];
    assert!(event.metadata.has("queue_message_id"));
    assert!(event.metadata.has("receipt_handle"));
    // Message attributes are folded back into metadata.
    assert_eq!(event.metadata.get("tenant"), Some("a"));
    assert_eq!(event.metadata.get("topic"), Some("wallet.debited"));

    drop(events);
    subscriber.stop().await.unwrap();
}

#[tokio::test]
async fn test_handler_error_extends_visibility_and_redelivers() {
    let broker = Arc::new(InMemoryBroker::new());
    let queue = broker.bind("#");
    let publisher = FanoutPublisher::new(Arc::clone(&broker) as Arc<dyn TopicClient>);

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let handler = Arc::new(EventHandlerFn::new("fail", move |_event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::Infrastructure("handler down".into()))
        })
    }));
    let subscriber = QueueSubscriber::new(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        handler,
        test_options(),
    );
    subscriber.start().await.unwrap();

    publisher
        .publish(&[sample_event("payment.created")])
        .await
        .unwrap();

    // Redelivered at least twice, never acked.
    assert!(
        wait_until(Duration::from_secs(4), || attempts.load(Ordering::SeqCst) >= 2).await,
        "expected at least two delivery attempts"
    );
    assert_eq!(queue.depth(), 1);

    subscriber.stop().await.unwrap();
}

#[tokio::test]
async fn test_unparseable_message_is_dropped_without_ack() {
    let broker = Arc::new(InMemoryBroker::new());
    let queue = broker.bind("#");

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    let handler = Arc::new(EventHandlerFn::new("noop", move |_event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }));
    let subscriber = QueueSubscriber::new(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        handler,
        test_options(),
    );
    queue.push_raw("not json at all");

    subscriber.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    subscriber.stop().await.unwrap();

    // Never handled, never acked: the broker's dead-letter policy owns it.
    assert_eq!(handled.load(Ordering::SeqCst), 0);
    assert_eq!(queue.depth(), 1);
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let broker = Arc::new(InMemoryBroker::new());
    let queue = broker.bind("#");
    let handler = Arc::new(EventHandlerFn::new("noop", |_event| {
        Box::pin(async { Ok(()) })
    }));
    let subscriber = QueueSubscriber::new(
        Arc::clone(&queue) as Arc<dyn QueueClient>,
        handler,
        test_options(),
    );

    subscriber.start().await.unwrap();
    subscriber.start().await.unwrap();
    subscriber.stop().await.unwrap();
    subscriber.stop().await.unwrap();

    // Restart after a full stop works.
    subscriber.start().await.unwrap();
    subscriber.stop().await.unwrap();
}
